use std::path::Path;

use leavebook_core::export::{render_records_export, ExportFormat as CoreExportFormat};

use crate::cli::{ExportFormat, GlobalOptions};
use crate::commands::common::{
    default_export_dir, open_refreshed_engine, sorted_records, write_manual_export,
};
use crate::error::CliError;

pub const fn core_format(format: ExportFormat) -> CoreExportFormat {
    match format {
        ExportFormat::Json => CoreExportFormat::Json,
        ExportFormat::Markdown => CoreExportFormat::Markdown,
    }
}

pub async fn run_export(
    format: ExportFormat,
    output_path: Option<&Path>,
    manual: bool,
    options: &GlobalOptions,
) -> Result<(), CliError> {
    let engine = open_refreshed_engine(options).await?;

    if manual {
        let export = engine.manual_export()?;
        let path = write_manual_export(&export, &default_export_dir()?)?;
        println!("{}", path.display());
        eprintln!("{}", export.instructions);
        return Ok(());
    }

    let records = match format {
        // Keep store order so the file can replace the shared data.json
        ExportFormat::Json => engine.records(),
        ExportFormat::Markdown => sorted_records(&engine.records()),
    };
    let rendered = render_records_export(&records, core_format(format))?;

    if let Some(path) = output_path {
        std::fs::write(path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }

    Ok(())
}
