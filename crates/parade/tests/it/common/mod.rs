use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use insta::internals::SettingsBindDropGuard;
use serde_json::{Value, json};
use tempfile::TempDir;

/// `parade.toml` that runs every test file through `sh`, so tests can be shell scripts.
const SHELL_CONFIG: &str = r#"
[worker]
launcher = ["sh"]
"#;

pub(crate) struct TestContext {
    _temp_dir: TempDir,
    root: Utf8PathBuf,
    _settings_scope: SettingsBindDropGuard,
}

impl TestContext {
    pub(crate) fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        // macOS temp directories live behind a `/private` symlink.
        let root = std::fs::canonicalize(temp_dir.path()).expect("Failed to canonicalize temp directory");
        let root = Utf8PathBuf::from_path_buf(root).expect("Temp directory path is not UTF-8");

        let mut settings = insta::Settings::clone_current();
        settings.add_filter(&regex::escape(root.as_str()), "[TEMP_DIR]");
        settings.add_filter(r"(\d+m )?\d+\.\d{3}s", "[TIME]");
        let settings_scope = settings.bind_to_scope();

        let context = Self {
            _temp_dir: temp_dir,
            root,
            _settings_scope: settings_scope,
        };
        context.write_file("parade.toml", SHELL_CONFIG);
        context
    }

    pub(crate) fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, String)>) -> Self {
        let context = Self::new();
        for (path, content) in files {
            context.write_file(path, &content);
        }
        context
    }

    pub(crate) fn write_file(&self, path: impl AsRef<Utf8Path>, content: &str) {
        let path = self.root.join(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, content).expect("Failed to write file");
    }

    pub(crate) fn command(&self) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_parade"));
        command
            .current_dir(&self.root)
            .env_remove("PARADE_LOG")
            .env_remove("PARADE_CONFIG_FILE")
            .args(["--color", "never", "--no-progress"]);
        command
    }
}

/// A shell worker that prints `messages` as protocol lines, ignoring its arguments.
pub(crate) fn worker(messages: &[Value]) -> String {
    let mut script = String::from("cat <<'PARADE'\n");
    for message in messages {
        script.push_str(&message.to_string());
        script.push('\n');
    }
    script.push_str("PARADE\n");
    script
}

pub(crate) fn tests(total: usize) -> Value {
    json!({"parade": true, "name": "tests", "args": [total]})
}

pub(crate) fn pass() -> Value {
    json!({"parade": true, "name": "pass", "args": []})
}

pub(crate) fn end() -> Value {
    json!({"parade": true, "name": "end", "args": []})
}

pub(crate) fn fail(title: &str, path: &[&str], message: &str, frames: &[(&str, u32)]) -> Value {
    let stack: Vec<Value> = frames
        .iter()
        .map(|(file, line)| json!({"file": file, "line": line}))
        .collect();
    json!({
        "parade": true,
        "name": "fail",
        "args": [{
            "title": title,
            "path": path,
            "error": {"type": "panic", "message": message, "stack": stack},
        }],
    })
}

pub(crate) fn pending(title: &str, path: &[&str]) -> Value {
    json!({"parade": true, "name": "pending", "args": [{"title": title, "path": path}]})
}
