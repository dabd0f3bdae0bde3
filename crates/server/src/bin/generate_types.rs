//! Writes the TypeScript declarations of the HTTP contract to `shared/types.ts`.
//!
//! `--check` compares instead of writing and exits non-zero when the file is stale.

use std::{env, fs, path::PathBuf, process::ExitCode};

use contracts::{
    FieldError, FieldErrorCode,
    api::{ErrorBody, ErrorCode, HerdSummary, Page, TransferAnimals, TransferResult, TypeCount},
    generated_declarations,
};
use server::routes::health::HealthStatus;
use ts_rs::TS;
use utils::response::ApiResponse;

fn generate() -> String {
    let mut decls = generated_declarations();
    decls.extend([
        FieldErrorCode::decl(),
        FieldError::decl(),
        ErrorCode::decl(),
        ErrorBody::decl(),
        Page::<()>::decl(),
        TransferAnimals::decl(),
        TransferResult::decl(),
        TypeCount::decl(),
        HerdSummary::decl(),
        HealthStatus::decl(),
        ApiResponse::<(), ()>::decl(),
    ]);

    let mut out = String::from("// This file was generated by `cargo run --bin generate_types`. Do not edit.\n\n");
    for decl in decls {
        out.push_str("export ");
        out.push_str(&decl);
        out.push_str("\n\n");
    }
    out.truncate(out.trim_end().len());
    out.push('\n');
    out
}

fn main() -> anyhow::Result<ExitCode> {
    let check = env::args().skip(1).any(|arg| arg == "--check");
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../shared/types.ts");
    let generated = generate();

    if check {
        let current = fs::read_to_string(&path).unwrap_or_default();
        if current == generated {
            println!("shared/types.ts is up to date");
            return Ok(ExitCode::SUCCESS);
        }
        eprintln!("shared/types.ts is out of date, run `cargo run --bin generate_types`");
        return Ok(ExitCode::FAILURE);
    }

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(&path, generated)?;
    println!("wrote {}", path.display());
    Ok(ExitCode::SUCCESS)
}
