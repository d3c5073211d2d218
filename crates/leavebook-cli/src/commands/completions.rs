use std::io::{self, Write};
use std::path::Path;

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::cli::{Cli, CompletionShell};
use crate::error::CliError;

const BIN_NAME: &str = "leavebook";

const fn target_shell(shell: CompletionShell) -> Shell {
    match shell {
        CompletionShell::Bash => Shell::Bash,
        CompletionShell::Zsh => Shell::Zsh,
        CompletionShell::Fish => Shell::Fish,
    }
}

/// Where a saved completion script is usually picked up from
pub fn install_hint(shell: CompletionShell, path: &Path) -> String {
    match shell {
        CompletionShell::Bash => format!("Add `source {}` to ~/.bashrc", path.display()),
        CompletionShell::Zsh => format!(
            "Place {} as _{BIN_NAME} in a directory on $fpath",
            path.display()
        ),
        CompletionShell::Fish => format!(
            "Place {} in ~/.config/fish/completions/{BIN_NAME}.fish",
            path.display()
        ),
    }
}

pub fn run_completions(shell: CompletionShell, output_path: Option<&Path>) -> Result<(), CliError> {
    let mut script = Vec::new();
    generate(
        target_shell(shell),
        &mut Cli::command(),
        BIN_NAME,
        &mut script,
    );

    let Some(path) = output_path else {
        io::stdout().write_all(&script)?;
        return Ok(());
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &script)?;
    println!("{}", path.display());
    eprintln!("{}", install_hint(shell, path));
    Ok(())
}
