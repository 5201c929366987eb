//! Additional DOSBox commands are edited one per line and handed to DOSBox
//! as a single line of `-c "..."` switches.

pub const COMMAND_FLAG: &str = "-c";
pub const EDIT_HINT: &str = "REM Put each command on a new line";

/// Single-line `-c "cmd"` form to one command per line.
pub fn to_multiline(single_line: &str) -> String {
    if single_line.trim().is_empty() {
        return String::new();
    }
    let parts = split_on_flag(single_line);
    let lone = parts.len() == 1;
    let mut lines = Vec::new();
    for part in parts {
        let line = part.trim().trim_matches('"').trim();
        if line.is_empty() {
            continue;
        }
        if lone && line.starts_with(EDIT_HINT) {
            continue;
        }
        lines.push(line);
    }
    lines.join("\n")
}

/// One command per line to the single-line `-c "cmd"` form. `REM` lines are dropped.
pub fn to_single_line(multiline: &str) -> String {
    multiline
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.to_uppercase().starts_with("REM"))
        .map(|line| format!("{COMMAND_FLAG} \"{line}\""))
        .collect::<Vec<_>>()
        .join(" ")
}

// Only a standalone `-c` counts; `mount -cd` or `x-c` stay intact.
fn split_on_flag(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let flag = COMMAND_FLAG.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut index = 0;
    while index < bytes.len() {
        let preceded = index == 0 || bytes[index - 1].is_ascii_whitespace();
        let followed = bytes
            .get(index + flag.len())
            .map_or(true, |next| next.is_ascii_whitespace() || *next == b'"');
        if preceded && followed && bytes[index..].starts_with(flag) {
            parts.push(&text[start..index]);
            index += flag.len();
            start = index;
            continue;
        }
        index += 1;
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_become_lines() {
        let single = r#"-c "mount d /cdrom -t cdrom" -c "imgmount e game.iso -t iso""#;
        assert_eq!(
            to_multiline(single),
            "mount d /cdrom -t cdrom\nimgmount e game.iso -t iso"
        );
    }

    #[test]
    fn lines_become_flags() {
        let multiline = "REM setup drives\nmount d /cdrom\n\n  config -set cpu cycles=max  \n";
        assert_eq!(
            to_single_line(multiline),
            r#"-c "mount d /cdrom" -c "config -set cpu cycles=max""#
        );
    }

    #[test]
    fn edit_hint_alone_is_dropped() {
        assert_eq!(to_multiline(EDIT_HINT), "");
        assert_eq!(to_multiline("   "), "");
        assert_eq!(to_single_line(EDIT_HINT), "");
    }

    #[test]
    fn embedded_dash_c_is_not_a_separator() {
        assert_eq!(to_multiline(r#"-c "mount -cd d""#), "mount -cd d");
    }
}
