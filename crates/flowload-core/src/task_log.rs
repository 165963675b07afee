use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One completed-task record from a simulated run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLogEntry {
    /// Task name exactly as it appears in the process definition.
    pub name: String,
    /// Cleared once a trace node has claimed this entry.
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl TaskLogEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            available: true,
        }
    }
}

/// Accepts either `"TaskName"` or `{ "name": "TaskName" }` per entry.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Name(String),
    Entry(TaskLogEntry),
}

/// Ordered task-completion log of a single simulated process instance.
///
/// Log order is completion order. Reconstruction consumes entries in place,
/// so each reconstruction needs its own log: clone before reusing one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskLog {
    entries: Vec<TaskLogEntry>,
}

impl<'de> Deserialize<'de> for TaskLog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<RawEntry>::deserialize(deserializer)?;
        let entries = raw
            .into_iter()
            .map(|r| match r {
                RawEntry::Name(name) => TaskLogEntry::new(name),
                RawEntry::Entry(entry) => entry,
            })
            .collect();
        Ok(Self { entries })
    }
}

impl Serialize for TaskLog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl TaskLog {
    /// Build a fresh log where every entry is available.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: names.into_iter().map(TaskLogEntry::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TaskLogEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&TaskLogEntry> {
        self.entries.get(index)
    }

    /// Index of the first still-available entry named `name`.
    pub fn find_available(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.available && e.name == name)
    }

    /// Indices of available entries, in log order.
    pub fn available_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.available)
            .map(|(i, _)| i)
    }

    /// Mark an entry consumed. Returns `false` if it was already consumed
    /// or the index is out of range.
    pub fn consume(&mut self, index: usize) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) if entry.available => {
                entry.available = false;
                true
            }
            _ => false,
        }
    }

    /// Names of entries nobody consumed, in log order.
    pub fn unconsumed(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.available)
            .map(|e| e.name.as_str())
            .collect()
    }
}
