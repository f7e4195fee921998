//! # office-locate
//!
//! Find a [LibreOffice](https://www.libreoffice.org/) executable for headless
//! conversions, so that services shelling out to `soffice` do not need the
//! path configured by hand on every machine.
//!
//! ## How it works
//!
//! On first call to [`locate_office`]:
//!
//! 1. `SOFFICE_PATH`, if set and pointing at an executable file.
//! 2. `soffice`, then `libreoffice`, on `PATH`.
//! 3. The platform's usual install locations (see below).
//!
//! The result is cached for the lifetime of the process.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use office_locate::locate_office;
//!
//! let soffice = locate_office().expect("LibreOffice not installed");
//! println!("using {}", soffice.display());
//! ```
//!
//! ## Install locations searched
//!
//! | OS      | Paths |
//! |---------|-------|
//! | macOS   | `/Applications/LibreOffice.app/Contents/MacOS/soffice`, `~/Applications/…` |
//! | Linux   | `/usr/lib/libreoffice/program/soffice`, `/usr/lib64/…`, |
//! |         | `/opt/libreoffice*/program/soffice`, `/snap/bin/libreoffice` |
//! | Windows | `C:\Program Files\LibreOffice\program\soffice.exe`, `C:\Program Files (x86)\…` |

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Environment variable that overrides discovery.
pub const SOFFICE_PATH_ENV: &str = "SOFFICE_PATH";

/// Executable names looked up on `PATH`, in order of preference.
pub const EXECUTABLE_NAMES: &[&str] = &["soffice", "libreoffice"];

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by office-locate.
#[derive(Error, Debug)]
pub enum LocateError {
    /// No executable was found anywhere.
    #[error(
        "LibreOffice executable not found.\n\
Searched:\n{}\n\
Install LibreOffice or set {}=/path/to/soffice.",
        format_searched(.searched),
        SOFFICE_PATH_ENV
    )]
    NotFound { searched: Vec<PathBuf> },
}

fn format_searched(searched: &[PathBuf]) -> String {
    searched
        .iter()
        .map(|p| format!("  • {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Thread-safe singleton path cache ─────────────────────────────────────────

static RESOLVED_PATH: OnceLock<PathBuf> = OnceLock::new();

// ── Public API ───────────────────────────────────────────────────────────────

/// Returns the path of a LibreOffice executable, searching on first use.
///
/// Safe to call from multiple threads; the search result is cached once
/// found. A failed search is not cached, so installing LibreOffice while the
/// process runs is picked up on the next call.
pub fn locate_office() -> Result<PathBuf, LocateError> {
    if let Some(path) = RESOLVED_PATH.get() {
        return Ok(path.clone());
    }

    let path = locate_with(
        std::env::var_os(SOFFICE_PATH_ENV),
        std::env::var_os("PATH"),
        &install_candidates(),
    )?;

    // Best-effort cache in the OnceLock (ignore race; both found the same file).
    let _ = RESOLVED_PATH.set(path.clone());

    Ok(path)
}

/// Returns `true` if `path` is a regular file this process could execute.
pub fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        true
    }
}

/// Platform install locations, most common first.
pub fn install_candidates() -> Vec<PathBuf> {
    let mut out = Vec::new();

    match std::env::consts::OS {
        "macos" => {
            out.push(PathBuf::from(
                "/Applications/LibreOffice.app/Contents/MacOS/soffice",
            ));
            if let Some(home) = dirs::home_dir() {
                out.push(home.join("Applications/LibreOffice.app/Contents/MacOS/soffice"));
            }
        }
        "windows" => {
            for base in ["C:\\Program Files", "C:\\Program Files (x86)"] {
                out.push(
                    PathBuf::from(base)
                        .join("LibreOffice")
                        .join("program")
                        .join("soffice.exe"),
                );
            }
        }
        _ => {
            out.push(PathBuf::from("/usr/lib/libreoffice/program/soffice"));
            out.push(PathBuf::from("/usr/lib64/libreoffice/program/soffice"));
            out.extend(opt_installs(Path::new("/opt")));
            out.push(PathBuf::from("/snap/bin/libreoffice"));
        }
    }

    out
}

// ── Internal helpers ─────────────────────────────────────────────────────────

/// The discovery order, with every input passed in so tests don't have to
/// touch the process environment.
fn locate_with(
    env_override: Option<OsString>,
    path_var: Option<OsString>,
    candidates: &[PathBuf],
) -> Result<PathBuf, LocateError> {
    let mut searched = Vec::new();

    // 1. Environment variable override.
    if let Some(p) = env_override.filter(|p| !p.is_empty()) {
        let p = PathBuf::from(p);
        if is_executable(&p) {
            return Ok(p);
        }
        // Fall through: override set but unusable → keep searching.
        searched.push(p);
    }

    // 2. PATH lookup.
    if let Some(path_var) = path_var {
        for name in EXECUTABLE_NAMES {
            for dir in std::env::split_paths(&path_var) {
                let p = dir.join(exe_name(name));
                if is_executable(&p) {
                    return Ok(p);
                }
            }
            searched.push(PathBuf::from(format!("$PATH/{}", exe_name(name))));
        }
    }

    // 3. Install locations.
    for p in candidates {
        if is_executable(p) {
            return Ok(p.clone());
        }
        searched.push(p.clone());
    }

    Err(LocateError::NotFound { searched })
}

fn exe_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

/// `/opt/libreoffice*/program/soffice`, in reverse name order.
fn opt_installs(opt: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(opt) else {
        return Vec::new();
    };

    let mut found: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with("libreoffice"))
        .map(|e| e.path().join("program").join("soffice"))
        .collect();

    found.sort();
    found.reverse();
    found
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn make_exe(dir: &Path, name: &str) -> PathBuf {
        let p = dir.join(name);
        std::fs::write(&p, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&p, std::fs::Permissions::from_mode(0o755)).unwrap();
        p
    }

    #[test]
    fn env_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        let exe = make_exe(dir.path(), "my-soffice");
        let path_dir = tempfile::tempdir().unwrap();
        make_exe(path_dir.path(), "soffice");

        let found = locate_with(
            Some(exe.clone().into_os_string()),
            Some(path_dir.path().as_os_str().to_owned()),
            &[],
        )
        .unwrap();
        assert_eq!(found, exe);
    }

    #[test]
    fn missing_override_falls_through_to_path() {
        let path_dir = tempfile::tempdir().unwrap();
        let exe = make_exe(path_dir.path(), "soffice");

        let found = locate_with(
            Some(OsString::from("/definitely/not/here/soffice")),
            Some(path_dir.path().as_os_str().to_owned()),
            &[],
        )
        .unwrap();
        assert_eq!(found, exe);
    }

    #[test]
    fn soffice_preferred_over_libreoffice() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        make_exe(a.path(), "libreoffice");
        let soffice = make_exe(b.path(), "soffice");

        let path_var = std::env::join_paths([a.path(), b.path()]).unwrap();
        let found = locate_with(None, Some(path_var), &[]).unwrap();
        assert_eq!(found, soffice);
    }

    #[test]
    fn non_executable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("soffice");
        std::fs::write(&p, "not executable").unwrap();
        std::fs::set_permissions(&p, std::fs::Permissions::from_mode(0o644)).unwrap();

        assert!(!is_executable(&p));
        assert!(locate_with(None, Some(dir.path().as_os_str().to_owned()), &[]).is_err());
    }

    #[test]
    fn install_candidate_used_last() {
        let dir = tempfile::tempdir().unwrap();
        let exe = make_exe(dir.path(), "soffice");
        let empty = tempfile::tempdir().unwrap();

        let found = locate_with(
            None,
            Some(empty.path().as_os_str().to_owned()),
            &[PathBuf::from("/nope/soffice"), exe.clone()],
        )
        .unwrap();
        assert_eq!(found, exe);
    }

    #[test]
    fn not_found_lists_everything_searched() {
        let empty = tempfile::tempdir().unwrap();
        let err = locate_with(
            Some(OsString::from("/bad/override")),
            Some(empty.path().as_os_str().to_owned()),
            &[PathBuf::from("/nope/soffice")],
        )
        .unwrap_err();

        let LocateError::NotFound { ref searched } = err;
        assert_eq!(searched.len(), 4);
        let msg = err.to_string();
        assert!(msg.contains("/bad/override"), "got: {msg}");
        assert!(msg.contains("/nope/soffice"), "got: {msg}");
        assert!(msg.contains(SOFFICE_PATH_ENV), "got: {msg}");
    }

    #[test]
    fn opt_installs_reverse_name_order() {
        let opt = tempfile::tempdir().unwrap();
        std::fs::create_dir(opt.path().join("libreoffice7.6")).unwrap();
        std::fs::create_dir(opt.path().join("libreoffice24.2")).unwrap();
        std::fs::create_dir(opt.path().join("other")).unwrap();

        let found = opt_installs(opt.path());
        assert_eq!(found.len(), 2);
        assert!(found[0].starts_with(opt.path().join("libreoffice7.6")));
        assert!(found.iter().all(|p| p.ends_with("program/soffice")));
    }

    #[test]
    fn candidates_nonempty() {
        assert!(!install_candidates().is_empty());
    }
}
