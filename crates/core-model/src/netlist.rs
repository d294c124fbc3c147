//! Flat netlist annotation: net names mapped to `REF-PIN` connection
//! identifiers. Entities never hold net pointers; membership is by name
//! only and the rat generator resolves names against the element arena.

/// One net: a name, an optional route style, and its connections.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Net {
    pub name: String,
    pub style: Option<String>,
    /// `REFDES-PINNUMBER` identifiers, case preserved but matched
    /// case-insensitively.
    pub connections: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Netlist {
    pub nets: Vec<Net>,
}

impl Netlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nets.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Net> {
        self.nets.iter().find(|n| n.name.eq_ignore_ascii_case(name))
    }

    /// The net a `REF-PIN` connection belongs to, if any.
    pub fn net_of_connection(&self, conn: &str) -> Option<&Net> {
        self.nets.iter().find(|n| {
            n.connections
                .iter()
                .any(|c| c.eq_ignore_ascii_case(conn))
        })
    }

    /// Add a connection, creating the net as needed. Returns false when the
    /// connection was already present on that net.
    pub fn add_connection(&mut self, net_name: &str, conn: &str) -> bool {
        if let Some(net) = self
            .nets
            .iter_mut()
            .find(|n| n.name.eq_ignore_ascii_case(net_name))
        {
            if net.connections.iter().any(|c| c.eq_ignore_ascii_case(conn)) {
                return false;
            }
            net.connections.push(conn.to_string());
            return true;
        }
        self.nets.push(Net {
            name: net_name.to_string(),
            style: None,
            connections: vec![conn.to_string()],
        });
        true
    }

    /// Remove a connection wherever it appears. Empty nets stay listed; a
    /// net with no members is still a named net.
    pub fn remove_connection(&mut self, conn: &str) -> bool {
        let mut removed = false;
        for net in &mut self.nets {
            let before = net.connections.len();
            net.connections.retain(|c| !c.eq_ignore_ascii_case(conn));
            removed |= net.connections.len() != before;
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_lookup_is_case_insensitive() {
        let mut nl = Netlist::new();
        assert!(nl.add_connection("GND", "U1-4"));
        assert!(!nl.add_connection("gnd", "u1-4"));
        assert_eq!(nl.net_of_connection("U1-4").map(|n| n.name.as_str()), Some("GND"));
        assert!(nl.find("Gnd").is_some());
        assert!(nl.remove_connection("U1-4"));
        assert!(nl.net_of_connection("U1-4").is_none());
        assert!(!nl.is_empty());
    }
}
