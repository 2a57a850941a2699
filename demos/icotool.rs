use clap::{App, Arg, SubCommand};
use icoforge::{CancellationToken, EncodeOptions, IconDir, ProbeOptions};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

//===========================================================================//

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let matches = App::new("icotool")
        .version("0.1")
        .about("Builds ICO files and extracts icons from executables")
        .subcommand(
            SubCommand::with_name("create")
                .about("Creates an ICO file from an image")
                .arg(
                    Arg::with_name("output")
                        .takes_value(true)
                        .value_name("PATH")
                        .short("o")
                        .long("output")
                        .help("Sets output path"),
                )
                .arg(
                    Arg::with_name("size")
                        .takes_value(true)
                        .multiple(true)
                        .short("s")
                        .long("size")
                        .help("Adds an icon size (default: 16-256)"),
                )
                .arg(Arg::with_name("image").required(true)),
        )
        .subcommand(
            SubCommand::with_name("extract")
                .about("Extracts one entry of an ICO file as PNG")
                .arg(
                    Arg::with_name("output")
                        .takes_value(true)
                        .value_name("PATH")
                        .short("o")
                        .long("output")
                        .help("Sets output path"),
                )
                .arg(Arg::with_name("ico").required(true))
                .arg(Arg::with_name("index").required(true)),
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("Lists icons in an ICO file")
                .arg(Arg::with_name("ico").required(true)),
        )
        .subcommand(
            SubCommand::with_name("exe")
                .about("Lists or exports icon groups of an executable")
                .arg(
                    Arg::with_name("output")
                        .takes_value(true)
                        .value_name("PATH")
                        .short("o")
                        .long("output")
                        .help("Writes the best icon group to this ICO path"),
                )
                .arg(Arg::with_name("binary").required(true)),
        )
        .get_matches();
    let result = if let Some(submatches) = matches.subcommand_matches("create") {
        let image = submatches.value_of("image").unwrap();
        let mut options = EncodeOptions::default();
        if let Some(sizes) = submatches.values_of("size") {
            let sizes: Result<Vec<u32>, _> = sizes.map(str::parse).collect();
            match sizes {
                Ok(sizes) => options.sizes = sizes,
                Err(error) => fail(&format!("Invalid size: {}", error)),
            }
        }
        let out_path = match submatches.value_of("output") {
            Some(path) => PathBuf::from(path),
            None => Path::new(image).with_extension("ico"),
        };
        println!("Writing {:?}", out_path);
        icoforge::convert_file(
            Path::new(image),
            &out_path,
            &options,
            &CancellationToken::new(),
        )
    } else if let Some(submatches) = matches.subcommand_matches("extract") {
        let path = submatches.value_of("ico").unwrap();
        let index = submatches.value_of("index").unwrap();
        let index = index.parse::<usize>().unwrap_or_else(|_| fail("Invalid index"));
        let out_path = match submatches.value_of("output") {
            Some(out) => PathBuf::from(out),
            None => PathBuf::from(format!("{}.{}.png", path, index)),
        };
        extract(Path::new(path), index, &out_path)
    } else if let Some(submatches) = matches.subcommand_matches("list") {
        list(Path::new(submatches.value_of("ico").unwrap()))
    } else if let Some(submatches) = matches.subcommand_matches("exe") {
        let binary = Path::new(submatches.value_of("binary").unwrap());
        exe(binary, submatches.value_of("output").map(Path::new))
    } else {
        fail(matches.usage())
    };
    if let Err(error) = result {
        fail(&error.to_string());
    }
}

fn fail(message: &str) -> ! {
    eprintln!("icotool: {}", message);
    process::exit(1);
}

fn list(path: &Path) -> icoforge::Result<()> {
    let data = fs::read(path)?;
    let icondir = IconDir::read(&data)?;
    for (index, entry) in icondir.entries().iter().enumerate() {
        let kind = if entry.is_png() { "PNG" } else { "BMP" };
        println!(
            "{:5}: {}x{} {}, {} bpp, {} bytes",
            index,
            entry.width(),
            entry.height(),
            kind,
            entry.bit_count(),
            entry.payload_size()
        );
    }
    Ok(())
}

fn extract(path: &Path, index: usize, out_path: &Path) -> icoforge::Result<()> {
    let data = fs::read(path)?;
    let icondir = IconDir::read(&data)?;
    let entry = match icondir.entries().get(index) {
        Some(entry) => entry,
        None => fail(&format!(
            "{:?} has only {} entries",
            path,
            icondir.entries().len()
        )),
    };
    let image = entry.decode(&data)?;
    let out_file = fs::File::create(out_path)?;
    image.write_png(out_file)
}

fn exe(binary: &Path, output: Option<&Path>) -> icoforge::Result<()> {
    let hit = icoforge::extract_from_path(
        binary,
        &ProbeOptions::default(),
        &CancellationToken::new(),
    )?;
    let hit = match hit {
        Some(hit) => hit,
        None => fail(&format!("No icon resources found for {:?}", binary)),
    };
    println!("Icons from {:?}", hit.path);
    for candidate in hit.candidates.iter() {
        let frames: Vec<String> = candidate
            .frames()
            .iter()
            .map(|f| format!("{}x{}@{}", f.width, f.height, f.bit_count))
            .collect();
        println!(
            "{:>12} lang {:#06x} score {:>10}: {}",
            candidate.name(),
            candidate.language(),
            candidate.score(),
            frames.join(" ")
        );
    }
    if let (Some(output), Some(best)) = (output, hit.candidates.first()) {
        icoforge::write_ico_file(output, best.ico_data())?;
    }
    Ok(())
}

//===========================================================================//
