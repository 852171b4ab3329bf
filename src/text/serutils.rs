use std::fmt::Display;
use std::io::{self, Write};

pub fn make_comment(comment: &str) -> String {
    if comment.is_empty() {
        String::new()
    } else {
        format!("# {}", comment)
    }
}

pub fn write_new_line<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\n")
}

pub fn write_line<W: Write>(w: &mut W, line: &str) -> io::Result<()> {
    w.write_all(line.as_bytes())?;
    write_new_line(w)
}

/// Empty comments produce no output.
pub fn write_comment_line<W: Write>(w: &mut W, comment: &str) -> io::Result<()> {
    let line = make_comment(comment);
    if line.is_empty() {
        return Ok(());
    }
    write_line(w, &line)
}

/// Writes `KEY value`, with the upper-cased key left-justified to `width`.
pub fn write_key_value<W: Write, V: Display>(
    w: &mut W,
    key: &str,
    value: V,
    width: usize,
) -> io::Result<()> {
    let key = key.to_uppercase();
    write_line(w, &format!("{:<width$} {}", key, value, width = width))
}

pub fn write_section_title<W: Write>(w: &mut W, section: &str) -> io::Result<()> {
    write_line(w, "###############")?;
    write_line(w, &format!("SECTION: {}", section.to_uppercase()))?;
    write_new_line(w)
}
