//! forge – command-line HTML → PDF converter driving `prince`.
//!
//! Usage:
//!   forge <input.html> [output.pdf] [-s sheet.css]... [--media print]
//!         [--server] [--no-javascript] [--timeout SECS] [--prince PATH]
//!         [--config FILE] [--legacy] [--strict] [--stdout] [--dry-run]
//!
//! If `output.pdf` is omitted the PDF is written next to the input file with
//! the same stem (e.g. `report.html` → `report.pdf`).

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use std::{env, fs, process};

use prince_forge::{Defaults, Executable, OutputTarget, Pdf, PdfError, RenderConfig};

const EXIT_USAGE: i32 = 1;
const EXIT_RENDER: i32 = 2;
const EXIT_TIMEOUT: i32 = 3;
const EXIT_FAILED: i32 = 4;

#[derive(Default)]
struct Args {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    config_file: Option<PathBuf>,
    style_sheets: Vec<PathBuf>,
    media: Option<String>,
    server: bool,
    no_javascript: bool,
    timeout: Option<Duration>,
    prince: Option<PathBuf>,
    legacy: bool,
    strict: bool,
    to_stdout: bool,
    dry_run: bool,
}

fn main() {
    env_logger::init();

    let argv: Vec<String> = env::args().collect();
    let prog = argv.first().map(String::as_str).unwrap_or("forge");

    let args = match parse_args(&argv[1.min(argv.len())..]) {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_usage(prog);
            process::exit(0);
        }
        Err(msg) => {
            eprintln!("{msg}");
            print_usage(prog);
            process::exit(EXIT_USAGE);
        }
    };

    let input = match &args.input {
        Some(p) => p.clone(),
        None => {
            eprintln!("Error: no input file specified.");
            print_usage(prog);
            process::exit(EXIT_USAGE);
        }
    };

    let config = match build_config(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(EXIT_USAGE);
        }
    };
    let pdf = Pdf::new(config);

    // Default output: same directory + same stem as input, but with .pdf
    let output = args.output.clone().unwrap_or_else(|| {
        let mut o = input.clone();
        o.set_extension("pdf");
        o
    });
    let target = if args.to_stdout {
        OutputTarget::Stdout
    } else {
        OutputTarget::from(output.as_path())
    };

    if args.dry_run {
        println!("{}", pdf.command_line(&target));
        return;
    }

    let html = match fs::read_to_string(&input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading '{}': {e}", input.display());
            process::exit(EXIT_USAGE);
        }
    };

    let result = match target {
        OutputTarget::Stdout => pdf.pdf_from_string(&html).and_then(|bytes| {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
            Ok(())
        }),
        OutputTarget::File(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    if let Err(e) = fs::create_dir_all(parent) {
                        eprintln!("Error creating output directory: {e}");
                        process::exit(EXIT_FAILED);
                    }
                }
            }
            pdf.render_to_file(&html, &path).map(|written| {
                eprintln!("Wrote '{}'", written.display());
            })
        }
    };

    if let Err(e) = result {
        eprintln!("Error generating PDF: {e}");
        process::exit(match e {
            PdfError::Render(_) => EXIT_RENDER,
            PdfError::Timeout { .. } => EXIT_TIMEOUT,
            PdfError::Config(_) => EXIT_USAGE,
            _ => EXIT_FAILED,
        });
    }
}

/// `Ok(None)` means `--help` was requested.
fn parse_args(argv: &[String]) -> Result<Option<Args>, String> {
    let mut args = Args::default();
    let mut positional = 0usize;

    let mut iter = argv.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("Missing value for {flag}"))
        };
        match arg.as_str() {
            "--style" | "-s" => args.style_sheets.push(PathBuf::from(value(arg.as_str())?)),
            "--media" | "-m" => args.media = Some(value(arg.as_str())?),
            "--server" => args.server = true,
            "--no-javascript" => args.no_javascript = true,
            "--timeout" => {
                let raw = value(arg.as_str())?;
                let timeout = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|s| *s > 0.0)
                    .and_then(|s| Duration::try_from_secs_f64(s).ok())
                    .ok_or_else(|| format!("Invalid --timeout: {raw}"))?;
                args.timeout = Some(timeout);
            }
            "--prince" => args.prince = Some(PathBuf::from(value(arg.as_str())?)),
            "--config" | "-c" => args.config_file = Some(PathBuf::from(value(arg.as_str())?)),
            "--legacy" => args.legacy = true,
            "--strict" => args.strict = true,
            "--stdout" => args.to_stdout = true,
            "--dry-run" => args.dry_run = true,
            "--help" | "-h" => return Ok(None),
            other if other.starts_with('-') && other != "-" => {
                return Err(format!("Unknown flag: {other}"));
            }
            path => {
                match positional {
                    0 => args.input = Some(PathBuf::from(path)),
                    1 => args.output = Some(PathBuf::from(path)),
                    _ => return Err(format!("Unexpected argument: {path}")),
                }
                positional += 1;
            }
        }
    }
    Ok(Some(args))
}

/// Config file first, then flags on top of it.
fn build_config(args: &Args) -> Result<RenderConfig, PdfError> {
    let defaults = if args.legacy {
        Defaults::Legacy
    } else {
        Defaults::Current
    };
    let mut config = match &args.config_file {
        Some(path) => RenderConfig::from_json_file_with_defaults(path, defaults)?,
        None => RenderConfig::with_defaults(defaults),
    };
    config.add_style_sheets(args.style_sheets.iter().cloned());
    if let Some(media) = &args.media {
        config.media = Some(media.clone());
    }
    if args.server {
        config.server_flag = true;
    }
    if args.no_javascript {
        config.javascript = false;
    }
    if let Some(timeout) = args.timeout {
        config.timeout = Some(timeout);
    }
    if let Some(prince) = &args.prince {
        config.executable = Some(Executable::new(prince));
    }
    if args.strict {
        config.strict_exit_status = true;
    }
    Ok(config)
}

fn print_usage(prog: &str) {
    eprintln!("forge – HTML to PDF through prince (prince-forge)");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <input.html> [output.pdf] [options]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <input.html>        HTML file to convert");
    eprintln!("  [output.pdf]        Output path (default: same stem as input with .pdf; '-' = stdout)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --style, -s FILE    Add a style sheet (repeatable, later sheets win)");
    eprintln!("  --media, -m TYPE    CSS media type, e.g. print or screen");
    eprintln!("  --server            Run prince in server mode");
    eprintln!("  --no-javascript     Disable JavaScript during rendering");
    eprintln!("  --timeout SECS      Kill prince after SECS seconds");
    eprintln!("  --prince PATH       prince executable (default: $PRINCE_PATH or PATH lookup)");
    eprintln!("  --config, -c FILE   JSON render config; flags override it");
    eprintln!("  --legacy            Legacy defaults: server on, JavaScript off");
    eprintln!("  --strict            Fail on non-zero exit even without prince errors");
    eprintln!("  --stdout            Stream the PDF to stdout");
    eprintln!("  --dry-run           Print the prince command line and exit");
    eprintln!("  --help              Print this message");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_repeated_style_sheets_and_flags() {
        let parsed = parse_args(&args(&[
            "in.html", "out.pdf", "-s", "a.css", "--style", "b.css", "--media", "print",
            "--timeout", "2.5", "--no-javascript",
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(parsed.input, Some(PathBuf::from("in.html")));
        assert_eq!(parsed.output, Some(PathBuf::from("out.pdf")));
        assert_eq!(parsed.style_sheets, [PathBuf::from("a.css"), PathBuf::from("b.css")]);
        assert_eq!(parsed.timeout, Some(Duration::from_millis(2500)));

        let config = build_config(&parsed).unwrap();
        assert!(!config.javascript);
        assert_eq!(config.media.as_deref(), Some("print"));
        assert_eq!(config.style_sheets().len(), 2);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_args(&args(&["--bogus"])).is_err());
        assert!(parse_args(&args(&["in.html", "--timeout"])).is_err());
        assert!(parse_args(&args(&["in.html", "--timeout", "-1"])).is_err());
        assert!(parse_args(&args(&["a", "b", "c"])).is_err());
        assert!(parse_args(&args(&["in.html", "--timeout", "1e300"])).is_err());
        assert!(parse_args(&args(&["in.html", "--timeout", "NaN"])).is_err());
    }

    #[test]
    fn dash_output_is_positional() {
        let parsed = parse_args(&args(&["in.html", "-"])).unwrap().unwrap();
        assert_eq!(parsed.output, Some(PathBuf::from("-")));
    }

    #[test]
    fn huge_timeout_parses() {
        let parsed = parse_args(&args(&["in.html", "--timeout", "1e19"])).unwrap().unwrap();
        assert_eq!(parsed.timeout, Some(Duration::from_secs(10_000_000_000_000_000_000)));
    }

    #[test]
    fn help_short_circuits() {
        assert!(parse_args(&args(&["-h"])).unwrap().is_none());
    }

    #[test]
    fn legacy_defaults_sit_under_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.json");
        fs::write(&path, r#"{"javascript": true, "media": "print"}"#).unwrap();
        let parsed = parse_args(&args(&["in.html", "--legacy", "--config", path.to_str().unwrap()]))
            .unwrap()
            .unwrap();
        let config = build_config(&parsed).unwrap();
        assert!(config.server_flag, "legacy default kept where the file is silent");
        assert!(config.javascript, "file value wins over legacy default");
        assert_eq!(config.media.as_deref(), Some("print"));
    }

    #[test]
    fn legacy_defaults() {
        let parsed = parse_args(&args(&["in.html", "--legacy"])).unwrap().unwrap();
        let config = build_config(&parsed).unwrap();
        assert!(config.server_flag);
        assert!(!config.javascript);
    }
}
