//! Paired forward and reverse statement lists.

/// Ordered UP and DOWN statements produced from a diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationQuery {
    up: Vec<String>,
    down: Vec<String>,
}

impl MigrationQuery {
    #[must_use]
    pub const fn new(up: Vec<String>, down: Vec<String>) -> Self {
        Self { up, down }
    }

    /// A single statement in each direction.
    #[must_use]
    pub fn pair(up: impl Into<String>, down: impl Into<String>) -> Self {
        Self::new(vec![up.into()], vec![down.into()])
    }

    #[must_use]
    pub fn up(&self) -> &[String] {
        &self.up
    }

    #[must_use]
    pub fn down(&self) -> &[String] {
        &self.down
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.up.is_empty() && self.down.is_empty()
    }

    /// Appends `other` after `self` in both directions.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.up.extend(other.up);
        self.down.extend(other.down);
        self
    }

    /// Moves statements containing `DROP` ahead of all others, in both
    /// directions, keeping relative order within each group.
    #[must_use]
    pub fn drops_first(self) -> Self {
        Self {
            up: drops_first(self.up),
            down: drops_first(self.down),
        }
    }
}

impl FromIterator<Self> for MigrationQuery {
    fn from_iter<I: IntoIterator<Item = Self>>(iter: I) -> Self {
        iter.into_iter().fold(Self::default(), Self::merge)
    }
}

fn drops_first(statements: Vec<String>) -> Vec<String> {
    let (mut drops, rest): (Vec<String>, Vec<String>) =
        statements.into_iter().partition(|s| s.contains("DROP"));
    drops.extend(rest);
    drops
}
