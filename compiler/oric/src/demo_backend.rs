//! A minimal illustrative back-end, for exercising the coordinator from
//! the command line without a real compiler attached.
//!
//! Each input file is a line-oriented script, one directive per line:
//!
//! ```text
//! waits module Foo       # block until Foo is defined as a module
//! waits struct Bar       # block until Bar is defined (module or struct)
//! defines struct Baz     # announce struct_available(Baz)
//! defines module Qux     # announce module_available(Qux) and finish
//! fails some reason text # finish with a synthetic compile error
//! ```
//!
//! `defines module` always ends the script (a file compiles to exactly
//! one module); every other directive falls through to the next line.

use std::fs;
use std::path::Path;

use ori_pcompile::{Backend, BackendFailure, File, Symbol, WaitKind, WaitReply, WorkerContext};

pub struct DemoBackend;

impl Backend for DemoBackend {
    fn compile(
        &self,
        file: &File,
        dest: Option<&Path>,
        ctx: &mut WorkerContext<'_>,
    ) -> Result<(), BackendFailure> {
        let source = fs::read_to_string(file.path()).map_err(|err| BackendFailure {
            kind: "io_error".to_string(),
            reason: format!("could not read {}: {err}", file.path().display()),
            stack: Vec::new(),
        })?;

        let defining = own_module(&source);

        for line in source.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            run_directive(line, file, dest, defining.clone(), ctx)?;
            if line.starts_with("defines module") {
                return Ok(());
            }
        }
        Ok(())
    }
}

/// Scan ahead for the module this script will eventually define, so
/// `waits` directives can tell the coordinator what they themselves are
/// in the middle of producing — required for deadlock detection to see
/// through a cycle rather than just a stall.
fn own_module(source: &str) -> Option<Symbol> {
    source.lines().find_map(|line| {
        let line = line.trim();
        let rest = line.strip_prefix("defines module ")?;
        Some(Symbol::new(rest.trim()))
    })
}

fn run_directive(
    line: &str,
    file: &File,
    dest: Option<&Path>,
    defining: Option<Symbol>,
    ctx: &mut WorkerContext<'_>,
) -> Result<(), BackendFailure> {
    let mut words = line.split_whitespace();
    match words.next() {
        Some("waits") => {
            let kind = parse_kind(words.next(), line)?;
            let name = words.next().ok_or_else(|| malformed(line))?;
            let reply = ctx.wait_for(kind, Symbol::new(name), defining);
            if reply == WaitReply::NotFound {
                return Err(BackendFailure {
                    kind: "undefined_reference".to_string(),
                    reason: format!("{name} is never defined"),
                    stack: Vec::new(),
                });
            }
            Ok(())
        }
        Some("defines") => {
            let kind = words.next().ok_or_else(|| malformed(line))?;
            let name = words.next().ok_or_else(|| malformed(line))?;
            match kind {
                "struct" => {
                    ctx.struct_available(Symbol::new(name));
                    Ok(())
                }
                "module" => {
                    let artifact = dest.map_or_else(Vec::new, |_| name.as_bytes().to_vec());
                    ctx.module_available(file.clone(), Symbol::new(name), artifact);
                    Ok(())
                }
                _ => Err(malformed(line)),
            }
        }
        Some("fails") => {
            let reason: String = words.collect::<Vec<_>>().join(" ");
            Err(BackendFailure {
                kind: "demo_error".to_string(),
                reason,
                stack: Vec::new(),
            })
        }
        _ => Err(malformed(line)),
    }
}

fn parse_kind(word: Option<&str>, line: &str) -> Result<WaitKind, BackendFailure> {
    match word {
        Some("module") => Ok(WaitKind::Module),
        Some("struct") => Ok(WaitKind::Struct),
        _ => Err(malformed(line)),
    }
}

fn malformed(line: &str) -> BackendFailure {
    BackendFailure {
        kind: "script_error".to_string(),
        reason: format!("malformed directive: {line:?}"),
        stack: Vec::new(),
    }
}
