use crate::error::CutoverError;

/// One named parameter group: a name followed by zero or more values.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGroup {
    pub name: String,
    pub values: Vec<String>,
}

/// A job request as handed over by the external driver: a job name plus
/// ordered parameter groups, already tokenized. The core never parses
/// `--flag value` syntax.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub name: String,
    pub groups: Vec<ParameterGroup>,
}

impl JobRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
        }
    }

    pub fn with_group(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.groups.push(ParameterGroup {
            name: name.into(),
            values,
        });
        self
    }

    /// First group with the given name.
    pub fn group(&self, name: &str) -> Option<&ParameterGroup> {
        self.groups.iter().find(|group| group.name == name)
    }

    /// Values of the named group; empty when the group is absent.
    pub fn values(&self, name: &str) -> &[String] {
        self.group(name).map(|g| g.values.as_slice()).unwrap_or(&[])
    }

    /// First value of the named group.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }

    /// First value of the named group, or a job error naming what is
    /// missing.
    pub fn require_value(&self, name: &str) -> Result<&str, CutoverError> {
        self.value(name).ok_or_else(|| {
            CutoverError::Job(format!(
                "job '{}' requires a '{}' parameter",
                self.name, name
            ))
        })
    }
}
