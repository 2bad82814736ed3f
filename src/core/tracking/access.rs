use std::collections::HashSet;

/// Static allow-list of Telegram user ids. An empty list admits everyone.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    users: HashSet<u64>,
}

impl AllowList {
    pub fn new(users: impl IntoIterator<Item = u64>) -> Self {
        Self {
            users: users.into_iter().collect(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.users.is_empty()
    }

    pub fn is_allowed(&self, user: u64) -> bool {
        self.is_open() || self.users.contains(&user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_allows_everyone() {
        let access = AllowList::default();
        assert!(access.is_open());
        assert!(access.is_allowed(1));
    }

    #[test]
    fn listed_users_only() {
        let access = AllowList::new([10, 20]);
        assert!(access.is_allowed(10));
        assert!(!access.is_allowed(30));
    }
}
