//! `idsport` — migrate legacy pulse files to the chunked-name schema.
//!
//! Usage:
//!   idsport <pulse> <run> <old-dir> <new-dir>
//!
//! Replace pulse and/or run with `all` to convert every matching pulse
//! file found in the old directory. Requires `IDSPORT_PREFIX` to point
//! at an install tree holding `models/ids.xml`, the `models/ids_model.*`
//! target triplet and the `models/convert_aos` executable.

use std::fs;
use std::path::Path;

use log::info;
use regex::Regex;

use idsport::pulse::{install_prefix, load_name_map, load_target_model};
use idsport::{migrate_pulse, CommandAosConverter, MigrateError};
use pulse_tree::{combined_id, pulse_stem, read_triplet, triplet_paths, write_triplet};

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 5 {
        eprintln!("Usage: idsport <pulse> <run> <old-dir> <new-dir>");
        eprintln!("Replace pulse and run number with \"all\" to convert all pulse files from <old-dir>");
        std::process::exit(1);
    }
    if let Err(e) = run(&args[1], &args[2], Path::new(&args[3]), Path::new(&args[4])) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run(pulse: &str, run: &str, old_dir: &Path, new_dir: &Path) -> Result<(), MigrateError> {
    let prefix = install_prefix()?;
    let jobs = enumerate_jobs(pulse, run, old_dir)?;
    let converter = CommandAosConverter::from_prefix(&prefix);

    for (pulse, run) in jobs {
        let id = combined_id(pulse, run);
        let stem = pulse_stem(id);
        info!("converting {stem} from {}", old_dir.display());

        // Stop outright when a selected pulse file is incomplete.
        for path in triplet_paths(old_dir, &stem) {
            if !path.is_file() {
                return Err(pulse_tree::TreeError::MissingFile(path).into());
            }
        }

        // The name map is rebuilt per pulse so stale entries never leak
        // from one file into the next.
        let names = load_name_map(&prefix)?;
        let src = read_triplet(old_dir, &stem)?;
        let mut dst = load_target_model(&prefix)?;
        dst.pulse = id;

        let report = migrate_pulse(&src, &mut dst, &names, &converter);
        write_triplet(&dst, new_dir, &stem)?;

        println!(
            "INCONSISTENT ITEMS: {}",
            serde_json::to_string(&report.failed_names).unwrap_or_default()
        );
        println!(
            "NODES NOT DEFINED IN MODEL: {}",
            serde_json::to_string(&report.missed_nodes).unwrap_or_default()
        );
    }
    Ok(())
}

/// Expands `all` selectors into concrete `(pulse, run)` pairs by scanning
/// the old directory for pulse-file stems. The combined identifier packs
/// the run into the last four digits, so a stem shorter than five digits
/// always belongs to pulse 0.
fn enumerate_jobs(pulse: &str, run: &str, old_dir: &Path) -> Result<Vec<(i64, i64)>, MigrateError> {
    if pulse != "all" && run != "all" {
        return Ok(vec![(parse_number("pulse", pulse)?, parse_number("run", run)?)]);
    }

    let stems = scan_stems(old_dir)?;
    let mut jobs = Vec::new();
    if pulse == "all" && run == "all" {
        for s in &stems {
            jobs.push(split_stem(s)?);
        }
    } else if run == "all" {
        let p = parse_number("pulse", pulse)?;
        let of_pulse = Regex::new(&format!("^{p}\\d{{4}}$")).expect("job pattern");
        for s in &stems {
            if s.len() < 5 || of_pulse.is_match(s) {
                let tail = &s[s.len().saturating_sub(4)..];
                jobs.push((p, parse_number("run", tail)?));
            }
        }
    } else {
        let r = parse_number("run", run)?;
        let of_run = Regex::new(&format!("^\\d*{r}$")).expect("job pattern");
        let bare = Regex::new(&format!("^0{{0,2}}{r}$")).expect("job pattern");
        for s in &stems {
            if of_run.is_match(s) && s.len() > 4 {
                jobs.push((parse_number("pulse", &s[..s.len() - 4])?, r));
            } else if bare.is_match(s) {
                jobs.push((0, r));
            }
        }
    }
    Ok(jobs)
}

/// Digit stems of every `ids_<digits>.datafile` in the directory.
fn scan_stems(old_dir: &Path) -> Result<Vec<String>, MigrateError> {
    let datafile = Regex::new(r"^ids_(\d+)\.datafile$").expect("stem pattern");
    let mut stems = Vec::new();
    for entry in fs::read_dir(old_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(caps) = datafile.captures(name) {
            stems.push(caps[1].to_string());
        }
    }
    stems.sort();
    Ok(stems)
}

/// Splits a combined-identifier stem into `(pulse, run)`.
fn split_stem(stem: &str) -> Result<(i64, i64), MigrateError> {
    if stem.len() > 4 {
        let (head, tail) = stem.split_at(stem.len() - 4);
        Ok((parse_number("pulse", head)?, parse_number("run", tail)?))
    } else {
        Ok((0, parse_number("run", stem)?))
    }
}

fn parse_number(what: &str, raw: &str) -> Result<i64, MigrateError> {
    raw.parse()
        .map_err(|_| MigrateError::BadArgument(format!("{what} must be a number, got {raw:?}")))
}
