//===========================================================================//

macro_rules! format_error {
    ($e:expr) => {
        return Err($crate::error::IconError::Format(::std::string::String::from($e)))
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::error::IconError::Format(format!($fmt, $($arg)+)))
    };
}

macro_rules! size_error {
    ($e:expr) => {
        return Err($crate::error::IconError::Size(::std::string::String::from($e)))
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::error::IconError::Size(format!($fmt, $($arg)+)))
    };
}

//===========================================================================//
