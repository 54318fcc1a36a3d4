use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use oric::DemoBackend;
use ori_pcompile::{files, files_to_path, CompileOptions, File};

fn main() -> ExitCode {
    oric::tracing_setup::init();

    let mut args = std::env::args().skip(1);
    let command = match args.next() {
        Some(cmd) => cmd,
        None => {
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match command.as_str() {
        "files" => run_files(args.collect(), None),
        "files-to-path" => {
            let Some(dest) = args.next() else {
                eprintln!("files-to-path requires a destination directory");
                return ExitCode::FAILURE;
            };
            run_files(args.collect(), Some(PathBuf::from(dest)))
        }
        other => {
            eprintln!("unknown command: {other}");
            print_usage();
            ExitCode::FAILURE
        }
    }
}

fn run_files(paths: Vec<String>, dest: Option<PathBuf>) -> ExitCode {
    if paths.is_empty() {
        eprintln!("no files given");
        return ExitCode::FAILURE;
    }

    let inputs: Vec<File> = paths.into_iter().map(File::new).collect();
    let backend = Arc::new(DemoBackend);
    let options = CompileOptions::new().with_on_file_done(|file| {
        tracing::info!(%file, "compiled");
    });

    let result = match &dest {
        Some(dest) => files_to_path(inputs, dest, backend, options),
        None => files(inputs, backend, options),
    };

    match result {
        Ok(modules) => {
            for module in modules {
                println!("{module}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err.render(Path::new(".")));
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    eprintln!("usage:");
    eprintln!("  oric files <file>...");
    eprintln!("  oric files-to-path <dest> <file>...");
}
