//! `TimeControl` header values (`"600+5"`) split into base time and increment.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeControl {
    pub base_seconds: u32,
    pub increment_seconds: u32,
}

fn parse_u32(s: &str) -> Option<u32> {
    s.trim().parse().ok()
}

/// Parse a single-period `base[+increment]` time control in seconds.
///
/// Unknown (`?`), unlimited (`-`), sandclock (`*60`), moves-based (`40/5400`) and multi-stage
/// (`40/5400+30:1800+30`) values have no single base/increment pair and yield `None`.
pub fn parse_timecontrol(raw: &str) -> Option<TimeControl> {
    let input = raw.trim();
    if input.is_empty() || input.contains([':', '/', '*']) {
        return None;
    }

    let (base, increment) = match input.split_once('+') {
        Some((base, inc)) => (parse_u32(base)?, parse_u32(inc)?),
        None => (parse_u32(input)?, 0),
    };

    Some(TimeControl {
        base_seconds: base,
        increment_seconds: increment,
    })
}

pub fn split_timecontrol(raw: &str) -> Option<(u32, u32)> {
    parse_timecontrol(raw).map(|tc| (tc.base_seconds, tc.increment_seconds))
}
