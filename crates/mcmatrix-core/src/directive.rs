//! Directive preprocessor: toggles version-guarded source regions.
//!
//! A region is a contiguous span of lines bounded by a start marker
//! (carrying a version predicate) and a matching end marker. The marker
//! syntax encodes the region's state:
//!
//! - open form — the enclosed lines are live code:
//!   `//: <predicate>` ... `//: END`
//! - closed form — the enclosed lines sit inside a block comment:
//!   `/*\ <predicate>` ... `\END */`
//!
//! Toggling a region rewrites only the two marker lines; each swap is
//! same-length (`//:` ↔ `/*\`, `//: END` ↔ `\END */`), so the enclosed
//! code is never touched and byte offsets stay valid. A file is written
//! back only when at least one region actually flipped, which makes the
//! pass idempotent: re-applying the same revision reports no change and
//! performs zero writes.
//!
//! Marker nesting is validated strictly. A start marker inside an open
//! region, an end marker without one, an end marker of the wrong family,
//! or an unclosed region at end of file abort the pass with
//! [`McMatrixError::MalformedDirective`].

use std::path::Path;

use tracing::debug;

use crate::error::{McMatrixError, Result};
use crate::version::{McVersion, VersionReq};

/// Open-form start prefix; the rest of the line is the predicate.
const OPEN_START: &str = "//: ";
/// Open-form end marker.
const OPEN_END: &str = "//: END";
/// Closed-form start prefix; the rest of the line is the predicate.
const CLOSED_START: &str = "/*\\ ";
/// Closed-form end marker.
const CLOSED_END: &str = "\\END */";

/// Whether a region's enclosed lines are currently live or commented out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegionState {
    Active,
    Inactive,
}

impl RegionState {
    /// The state this region should be in for `target`.
    fn wanted(req: &VersionReq, target: &McVersion) -> Self {
        if req.matches(target) {
            RegionState::Active
        } else {
            RegionState::Inactive
        }
    }
}

/// One classified line of a source file.
enum MarkerLine {
    /// `//: <predicate>` — start of an active region.
    Start(RegionState, VersionReq),
    /// `//: END` or `\END */`.
    End(RegionState),
    /// Anything else.
    Plain,
}

fn classify(file: &Path, line_no: usize, line: &str) -> Result<MarkerLine> {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix(OPEN_START) {
        if rest.starts_with("END") {
            return Ok(MarkerLine::End(RegionState::Active));
        }
        let req = parse_predicate(file, line_no, trimmed, rest)?;
        return Ok(MarkerLine::Start(RegionState::Active, req));
    }
    if let Some(rest) = trimmed.strip_prefix(CLOSED_START) {
        let req = parse_predicate(file, line_no, trimmed, rest)?;
        return Ok(MarkerLine::Start(RegionState::Inactive, req));
    }
    if trimmed.starts_with(CLOSED_END) {
        return Ok(MarkerLine::End(RegionState::Inactive));
    }
    Ok(MarkerLine::Plain)
}

fn parse_predicate(file: &Path, line_no: usize, line: &str, rest: &str) -> Result<VersionReq> {
    VersionReq::parse(rest.trim_end()).map_err(|_| McMatrixError::MalformedDirective {
        file: file.to_path_buf(),
        line: line_no,
        found: line.trim_end().to_string(),
        expected: "parsable version predicate",
    })
}

/// Swap a start marker line to the other family. Same-length substitution.
fn swap_start(line: &str, to: RegionState) -> String {
    match to {
        RegionState::Active => line.replacen("/*\\", "//:", 1),
        RegionState::Inactive => line.replacen("//:", "/*\\", 1),
    }
}

/// Swap an end marker line to the other family. Same-length substitution.
fn swap_end(line: &str, to: RegionState) -> String {
    match to {
        RegionState::Active => line.replacen(CLOSED_END, OPEN_END, 1),
        RegionState::Inactive => line.replacen(OPEN_END, CLOSED_END, 1),
    }
}

fn malformed(file: &Path, line_no: usize, line: &str, expected: &'static str) -> McMatrixError {
    McMatrixError::MalformedDirective {
        file: file.to_path_buf(),
        line: line_no,
        found: line.trim().to_string(),
        expected,
    }
}

/// Apply the preprocessor to one file for `target`.
///
/// Returns whether any region flipped. The file is rewritten in place
/// only in that case; all non-marker bytes and line endings are preserved
/// exactly.
pub fn apply_to_file(path: &Path, target: &McVersion) -> Result<bool> {
    let contents = std::fs::read_to_string(path)?;
    let mut lines: Vec<String> = contents
        .split_inclusive('\n')
        .map(str::to_string)
        .collect();

    // (index of the start line, state recorded in the file, wanted state)
    let mut open_region: Option<(usize, RegionState, RegionState)> = None;
    let mut changed = false;

    for idx in 0..lines.len() {
        let line_no = idx + 1;
        match classify(path, line_no, &lines[idx])? {
            MarkerLine::Start(current, req) => {
                if open_region.is_some() {
                    return Err(malformed(path, line_no, &lines[idx], "closing marker"));
                }
                let wanted = RegionState::wanted(&req, target);
                open_region = Some((idx, current, wanted));
            }
            MarkerLine::End(family) => {
                let (start_idx, current, wanted) = open_region
                    .take()
                    .ok_or_else(|| malformed(path, line_no, &lines[idx], "opening marker"))?;
                if family != current {
                    return Err(malformed(path, line_no, &lines[idx], "closing marker of the same family"));
                }
                if current != wanted {
                    let new_start = swap_start(&lines[start_idx], wanted);
                    let new_end = swap_end(&lines[idx], wanted);
                    debug!(
                        file = %path.display(),
                        line = start_idx + 1,
                        "toggling region to {:?}",
                        wanted
                    );
                    lines[start_idx] = new_start;
                    lines[idx] = new_end;
                    changed = true;
                }
            }
            MarkerLine::Plain => {}
        }
    }

    if let Some((start_idx, _, _)) = open_region {
        return Err(malformed(path, start_idx + 1, &lines[start_idx], "closing marker before end of file"));
    }

    if changed {
        std::fs::write(path, lines.concat())?;
    }

    Ok(changed)
}

/// Apply the preprocessor to every `.{ext}` file under `root`, in
/// deterministic (sorted) order. Returns whether any file changed.
///
/// Aborts on the first malformed file; later files are left untouched.
pub fn apply_to_tree(root: &Path, ext: &str, target: &McVersion) -> Result<bool> {
    let mut files = Vec::new();
    collect_sources(root, ext, &mut files)?;
    files.sort();

    let mut changed = false;
    for file in &files {
        if apply_to_file(file, target)? {
            changed = true;
        }
    }
    Ok(changed)
}

fn collect_sources(dir: &Path, ext: &str, out: &mut Vec<std::path::PathBuf>) -> Result<()> {
    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        // A declared source root that does not exist contributes no files.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(McMatrixError::Io(e)),
    };
    for entry in read_dir {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_sources(&path, ext, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some(ext) {
            out.push(path);
        }
    }
    Ok(())
}
