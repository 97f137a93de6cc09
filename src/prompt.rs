use std::path::Path;

use colored::Colorize;

pub struct Prompt {
    template: Option<String>,
    user: String,
    host: String,
}

impl Prompt {
    /// `template` replaces the default prompt verbatim (no escapes).
    pub fn new(template: Option<String>) -> Self {
        let host = whoami::fallible::hostname().unwrap_or_else(|_| String::from("localhost"));
        Self {
            template,
            user: whoami::username(),
            host,
        }
    }

    pub fn get_string(&self, cwd: &Path) -> String {
        if let Some(template) = &self.template {
            return template.clone();
        }

        let identity = format!("{}@{}", self.user, self.host);
        format!(
            "{}:{}$ ",
            identity.green().bold(),
            cwd.display().to_string().blue().bold()
        )
    }
}
