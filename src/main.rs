use clap::{
    crate_authors, crate_description, crate_name, crate_version, Arg, ArgAction, ArgMatches,
    Command,
};
use colored::Colorize;
use mkspecimen::{
    api::{self, CreateOptions},
    diskpart::{Diskpart, DEFAULT_LABEL},
    links::Mklink,
    timestomp::TimestompHelper,
};
use std::path::PathBuf;

// The CLI layer should only parse inputs and forward them to library code.
fn main() {
    let matches = Command::new(crate_name!())
        .about(crate_description!())
        .author(crate_authors!())
        .version(crate_version!())
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("create")
                .about("Provisions the NTFS specimen VHD and populates the fixture catalog")
                .arg(
                    Arg::new("output-root")
                        .long("output-root")
                        .help("Directory the versioned workspace is created under")
                        .default_value("."),
                )
                .arg(
                    Arg::new("label")
                        .long("label")
                        .help("Volume label of the formatted partition")
                        .default_value(DEFAULT_LABEL),
                )
                .arg(
                    Arg::new("drive-letter")
                        .long("drive-letter")
                        .help("Drive letter the mounted volume is assigned")
                        .default_value("v"),
                )
                .arg(
                    Arg::new("timestomp")
                        .long("timestomp")
                        .help("Path to the timestamp-modification helper")
                        .default_value("timestomp.py"),
                ),
        )
        .get_matches();

    let is_verbose = matches.get_flag("verbose");

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if is_verbose { "debug" } else { "warn" }),
    )
    .init();

    match matches.subcommand() {
        Some(("create", args)) => {
            handle_create(args);
        }
        _ => unreachable!(),
    }
}

fn handle_create(args: &ArgMatches) {
    let output_root = args.get_one::<String>("output-root").expect("has default");
    let label = args.get_one::<String>("label").expect("has default");
    let letter = args.get_one::<String>("drive-letter").expect("has default");
    let timestomp = args.get_one::<String>("timestomp").expect("has default");

    let mut letters = letter.chars();
    let drive_letter = match (letters.next(), letters.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => c,
        _ => {
            eprintln!("drive letter must be a single letter, got '{letter}'");
            std::process::exit(1);
        }
    };

    let options = CreateOptions {
        output_root: PathBuf::from(output_root),
        label: label.clone(),
        drive_letter,
    };
    let helper = TimestompHelper {
        exe: PathBuf::from(timestomp),
    };

    match api::create_specimens(&options, &Diskpart, &Mklink, &helper) {
        Ok(summary) => {
            println!(
                "{} specimen volume at {} (workspace {})",
                "done".green(),
                summary.image_path.display(),
                summary.workspace.display()
            );
        }
        Err(error) => {
            eprintln!("{:?}", miette::Report::new(error));
            std::process::exit(1);
        }
    }
}
