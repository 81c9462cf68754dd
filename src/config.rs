use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;
use cross_xdg::BaseDirs;

/// Debugger display defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugSettings {
    pub show_state: bool,
    /// Tape cells shown left of the head.
    pub band_left: usize,
    /// Tape cells shown right of the head.
    pub band_right: usize,
    /// Instructions shown before the pointer.
    pub prog_left: usize,
    /// Instructions shown after the pointer.
    pub prog_right: usize,
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            show_state: true,
            band_left: 25,
            band_right: 25,
            prog_left: 25,
            prog_right: 25,
        }
    }
}

/// Default I/O encodings. `None` means characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IoSettings {
    pub read_base: Option<u32>,
    pub write_base: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub debugger: DebugSettings,
    pub io: IoSettings,
}

static SETTINGS: OnceLock<Settings> = OnceLock::new();

pub fn settings() -> &'static Settings {
    SETTINGS.get_or_init(|| load_from_toml().unwrap_or_default())
}

fn config_path() -> Option<PathBuf> {
    // BF_CONFIG wins over the XDG location
    if let Ok(path) = env::var("BF_CONFIG") {
        return Some(PathBuf::from(path));
    }

    // On Linux: resolves to /home/<user>/.config
    // On Windows: resolves to C:\Users\<user>\.config
    // On macOS: resolves to /Users/<user>/.config
    let base_dirs = BaseDirs::new().ok()?;
    let mut path = PathBuf::from(base_dirs.config_home());
    path.push("bf.toml");
    Some(path)
}

fn load_from_toml() -> Option<Settings> {
    let path = config_path()?;
    let content = fs::read_to_string(&path).ok()?;
    tracing::debug!(path = %path.display(), "loaded config");
    Some(parse_settings(&content))
}

/// Read `[debugger]` and `[io]` keys out of a small TOML subset:
/// section headers, `key = value` pairs, `#` comments. Unknown keys and
/// values that don't parse are ignored.
pub fn parse_settings(content: &str) -> Settings {
    let mut section = String::new();
    let mut map: HashMap<(String, String), String> = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') { continue; }
        if line.starts_with('[') && line.ends_with(']') {
            section = line[1..line.len()-1].trim().to_string();
            continue;
        }
        if let Some(eq) = line.find('=') {
            let key = line[..eq].trim().to_string();
            let val_raw = line[eq+1..].trim();
            // Accept quoted or unquoted
            let val = if val_raw.starts_with('"') && val_raw.ends_with('"') && val_raw.len() >= 2 {
                val_raw[1..val_raw.len()-1].to_string()
            } else { val_raw.to_string() };
            map.insert((section.clone(), key), val);
        }
    }

    let mut cfg = Settings::default();

    macro_rules! set {
        ($section:literal, $key:literal, $($field:ident).+) => {
            match map.get(&($section.to_string(), $key.to_string())).map(|s| s.parse()) {
                Some(Ok(v)) => cfg.$($field).+ = v,
                Some(Err(_)) => tracing::warn!(section = $section, key = $key, "ignoring invalid config value"),
                None => {}
            }
        };
    }

    set!("debugger", "show_state", debugger.show_state);
    set!("debugger", "band_left", debugger.band_left);
    set!("debugger", "band_right", debugger.band_right);
    set!("debugger", "prog_left", debugger.prog_left);
    set!("debugger", "prog_right", debugger.prog_right);

    macro_rules! set_base {
        ($key:literal, $field:ident) => {
            match map.get(&("io".to_string(), $key.to_string())).map(|s| s.parse::<u32>()) {
                Some(Ok(v)) => cfg.io.$field = Some(v),
                Some(Err(_)) => tracing::warn!(section = "io", key = $key, "ignoring invalid config value"),
                None => {}
            }
        };
    }

    set_base!("read_base", read_base);
    set_base!("write_base", write_base);

    cfg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_gives_defaults() {
        assert_eq!(parse_settings(""), Settings::default());
    }

    #[test]
    fn sections_and_keys_are_read() {
        let cfg = parse_settings(
            r#"
# debugger layout
[debugger]
show_state = false
band_left = 5
prog_right = "40"

[io]
read_base = 16
write_base = 2
"#,
        );
        assert!(!cfg.debugger.show_state);
        assert_eq!(cfg.debugger.band_left, 5);
        assert_eq!(cfg.debugger.band_right, 25);
        assert_eq!(cfg.debugger.prog_right, 40);
        assert_eq!(cfg.io.read_base, Some(16));
        assert_eq!(cfg.io.write_base, Some(2));
    }

    #[test]
    fn keys_outside_their_section_are_ignored() {
        let cfg = parse_settings("band_left = 3\n[io]\nband_left = 4\nread_base = nope\n");
        assert_eq!(cfg.debugger.band_left, 25);
        assert_eq!(cfg.io.read_base, None);
    }
}
