//! Writing the combined file to a staging path and moving it into place.

use std::{
    fs::{self, File},
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::error::{DatasetError, Error, Result};

pub const OVERWRITE_QUESTION: &str = "Do you want to overwrite it? (yes/no)";
pub const REPROMPT: &str = "Please enter 'yes' or 'no'";

/// Asks the user a question and returns the raw answer. End of input is an
/// `UnexpectedEof` error.
pub trait Prompt {
    fn ask(&mut self, message: &str) -> io::Result<String>;
}

#[derive(Debug, Default)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn ask(&mut self, message: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        writeln!(stdout, "{}", message)?;
        stdout.flush()?;

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "no answer on standard input",
            ));
        }

        Ok(answer)
    }
}

#[derive(Debug, Default)]
/// Answers "yes" to everything.
pub struct AssumeYes;

impl Prompt for AssumeYes {
    fn ask(&mut self, _message: &str) -> io::Result<String> {
        Ok("yes".to_string())
    }
}

pub enum OverwritePolicy<'a> {
    /// Replace an existing destination without asking.
    Replace,
    Confirm(&'a mut dyn Prompt),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relocation {
    Moved(PathBuf),
    /// The destination already existed and the user kept it. The staged file
    /// is left where it was.
    Declined { staged: PathBuf, destination: PathBuf },
}

/// Runs `write` against `path`. A partial file is removed when it fails.
pub fn stage<F>(path: &Path, write: F) -> Result<PathBuf>
where
    F: FnOnce(&Path) -> std::result::Result<(), DatasetError>,
{
    if let Err(e) = write(path) {
        if path.exists() {
            let _ = fs::remove_file(path);
        }
        return Err(Error::Write(path.to_path_buf(), e));
    }

    Ok(path.to_path_buf())
}

/// Moves `staged` into `destination_dir`, keeping its file name.
pub fn relocate(
    staged: &Path,
    destination_dir: &Path,
    policy: OverwritePolicy<'_>,
) -> Result<Relocation> {
    let file_name = staged.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", staged.display()),
        )
    })?;
    fs::create_dir_all(destination_dir)?;
    let destination = destination_dir.join(file_name);

    if destination.exists() {
        if let OverwritePolicy::Confirm(prompt) = policy {
            let question = format!("File {} already exists. {}", destination.display(), OVERWRITE_QUESTION);
            if !confirm(prompt, &question)? {
                return Ok(Relocation::Declined {
                    staged: staged.to_path_buf(),
                    destination,
                });
            }
        }
    }

    move_file(staged, &destination)?;

    Ok(Relocation::Moved(destination))
}

fn confirm(prompt: &mut dyn Prompt, question: &str) -> Result<bool> {
    let mut message = question;
    loop {
        let answer = prompt.ask(message).map_err(Error::Prompt)?;
        match answer.trim().to_lowercase().as_str() {
            "yes" => return Ok(true),
            "no" => return Ok(false),
            _ => message = REPROMPT,
        }
    }
}

// Rename, or copy through a temporary file next to the destination when the
// two paths are on different filesystems.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    let copy = || -> io::Result<()> {
        let dir = to.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        io::copy(&mut File::open(from)?, temp.as_file_mut())?;
        temp.as_file().sync_all()?;
        temp.persist(to).map_err(|e| e.error)?;
        fs::remove_file(from)
    };

    copy().map_err(|source| Error::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

// -- Tests -------------------------------------------------------------------
