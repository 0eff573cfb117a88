//! ConnectionId - 接続ごとの識別子（ログ用）
//!
//! ULID を使うので生成順にソートでき、ログを時系列で追いやすい。

use std::fmt;
use ulid::Ulid;

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Ulid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_has_prefix() {
        let id = ConnectionId::new();
        let text = id.to_string();
        let ulid = text.strip_prefix("conn-").unwrap();
        assert_eq!(ulid.len(), 26);
        assert!(ulid.parse::<Ulid>().is_ok());
    }

    #[test]
    fn ids_are_sortable() {
        let id1 = ConnectionId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = ConnectionId::new();
        assert!(id1 < id2);
    }
}
