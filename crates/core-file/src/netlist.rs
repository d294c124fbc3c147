//! Netlist file parsing: one net per line, `netname style ref-pin
//! ref-pin ...`, with backslash-continued lines keeping their style slot.
//! Names match case-insensitively; the stored spelling is the first seen.

use core_model::{Net, Netlist};
use tracing::debug;

/// Parse the whitespace/colon separated netlist format.
pub fn parse_netlist(src: &str) -> Netlist {
    let mut netlist = Netlist::new();
    let mut continued: Option<usize> = None; // index of the net being continued
    for raw in src.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continued = None;
            continue;
        }
        let (body, continues) = match line.strip_suffix('\\') {
            Some(rest) => (rest.trim_end(), true),
            None => (line, false),
        };
        // Colons may separate the name from its members.
        let body = body.replace(':', " ");
        let mut fields = body.split_whitespace();
        if let Some(net_idx) = continued {
            // Continuation lines carry members only; the style slot stays
            // with the opening line.
            for conn in fields {
                add_conn(&mut netlist.nets[net_idx], conn);
            }
        } else {
            let Some(name) = fields.next() else {
                continue;
            };
            let mut rest: Vec<&str> = fields.collect();
            // The first member slot is the route style when it carries no
            // pin separator.
            let style = if rest.first().is_some_and(|f| !f.contains('-')) {
                Some(rest.remove(0).to_string())
            } else {
                None
            };
            let idx = match netlist
                .nets
                .iter()
                .position(|n| n.name.eq_ignore_ascii_case(name))
            {
                Some(i) => i,
                None => {
                    netlist.nets.push(Net {
                        name: name.to_string(),
                        style,
                        connections: Vec::new(),
                    });
                    netlist.nets.len() - 1
                }
            };
            for conn in rest {
                add_conn(&mut netlist.nets[idx], conn);
            }
            continued = Some(idx);
        }
        if !continues {
            continued = None;
        }
    }
    debug!(target: "file", nets = netlist.nets.len(), "netlist_parsed");
    netlist
}

fn add_conn(net: &mut Net, conn: &str) {
    if !net
        .connections
        .iter()
        .any(|c| c.eq_ignore_ascii_case(conn))
    {
        net.connections.push(conn.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_nets() {
        let nl = parse_netlist("GND Signal U1-4 U2-4\nVCC Power U1-8 U2-8\n");
        assert_eq!(nl.nets.len(), 2);
        assert_eq!(nl.nets[0].name, "GND");
        assert_eq!(nl.nets[0].style.as_deref(), Some("Signal"));
        assert_eq!(nl.nets[0].connections, vec!["U1-4", "U2-4"]);
    }

    #[test]
    fn continuation_preserves_style_slot() {
        let nl = parse_netlist("GND Signal U1-4 \\\n U2-4 U3-4\n");
        assert_eq!(nl.nets.len(), 1);
        assert_eq!(nl.nets[0].style.as_deref(), Some("Signal"));
        assert_eq!(nl.nets[0].connections, vec!["U1-4", "U2-4", "U3-4"]);
    }

    #[test]
    fn names_merge_case_insensitively() {
        let nl = parse_netlist("gnd Signal U1-4\nGND Signal u1-4 U2-4\n");
        assert_eq!(nl.nets.len(), 1);
        assert_eq!(nl.nets[0].connections, vec!["U1-4", "U2-4"]);
    }

    #[test]
    fn comments_and_blanks_skip() {
        let nl = parse_netlist("# header\n\nNET1 Signal U1-1\n");
        assert_eq!(nl.nets.len(), 1);
    }

    #[test]
    fn net_without_style_keeps_members() {
        let nl = parse_netlist("RESET U1-3 U4-9\n");
        assert_eq!(nl.nets[0].style, None);
        assert_eq!(nl.nets[0].connections.len(), 2);
    }
}
