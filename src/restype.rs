#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

//===========================================================================//

/// The standard numeric resource type codes found at the top level of a PE
/// resource directory.  Only `Icon` and `GroupIcon` drive extraction; the
/// rest exist so that other resource types can be reported by name.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum ResourceType {
    /// RT_CURSOR
    Cursor,
    /// RT_BITMAP
    Bitmap,
    /// RT_ICON: a single icon image (DIB or PNG payload)
    Icon,
    /// RT_MENU
    Menu,
    /// RT_DIALOG
    Dialog,
    /// RT_STRING
    String,
    /// RT_RCDATA
    RcData,
    /// RT_GROUP_CURSOR
    GroupCursor,
    /// RT_GROUP_ICON: a directory of RT_ICON frames forming one icon
    GroupIcon,
    /// RT_VERSION
    Version,
    /// RT_MANIFEST
    Manifest,
}

impl ResourceType {
    /// Maps a numeric resource type code to a known type.
    pub fn from_number(number: u16) -> Option<ResourceType> {
        match number {
            1 => Some(ResourceType::Cursor),
            2 => Some(ResourceType::Bitmap),
            3 => Some(ResourceType::Icon),
            4 => Some(ResourceType::Menu),
            5 => Some(ResourceType::Dialog),
            6 => Some(ResourceType::String),
            10 => Some(ResourceType::RcData),
            12 => Some(ResourceType::GroupCursor),
            14 => Some(ResourceType::GroupIcon),
            16 => Some(ResourceType::Version),
            24 => Some(ResourceType::Manifest),
            _ => None,
        }
    }

    /// Returns the numeric resource type code.
    pub fn number(&self) -> u16 {
        match *self {
            ResourceType::Cursor => 1,
            ResourceType::Bitmap => 2,
            ResourceType::Icon => 3,
            ResourceType::Menu => 4,
            ResourceType::Dialog => 5,
            ResourceType::String => 6,
            ResourceType::RcData => 10,
            ResourceType::GroupCursor => 12,
            ResourceType::GroupIcon => 14,
            ResourceType::Version => 16,
            ResourceType::Manifest => 24,
        }
    }
}

//===========================================================================//


//===========================================================================//
