//! Wave schedule loading.
//!
//! A `.waves` file lists one wave per line as `tick: KIND, KIND, ...`.
//! Comments (`#`) and blank lines are skipped; malformed lines are logged
//! and dropped rather than failing the whole file.

use crate::entity::CreepKind;
use crate::level::LoadError;
use tracing::{info, warn};

/// A scheduled, simultaneous spawn of creeps for every player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wave {
    pub tick: u64,
    pub creeps: Vec<CreepKind>,
}

/// Load a wave schedule from a file, sorted by tick.
pub fn load(path: &str) -> Result<Vec<Wave>, LoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_string(),
        source,
    })?;
    let waves = parse(&contents);
    info!("Loaded {} waves from {}", waves.len(), path);
    Ok(waves)
}

/// Parse a wave schedule from its text form.
pub fn parse(text: &str) -> Vec<Wave> {
    let mut waves: Vec<Wave> = text
        .lines()
        .enumerate()
        .filter_map(|(index, line)| parse_line(line, index + 1))
        .collect();
    waves.sort_by_key(|wave| wave.tick);
    waves
}

fn parse_line(line: &str, line_number: usize) -> Option<Wave> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let Some((tick_part, creeps_part)) = line.split_once(':') else {
        warn!("Invalid wave format at line {}: {}", line_number, line);
        return None;
    };

    let Ok(tick) = tick_part.trim().parse::<u64>() else {
        warn!("Invalid tick number at line {}: {}", line_number, tick_part);
        return None;
    };

    let creeps: Vec<CreepKind> = creeps_part
        .split(',')
        .filter_map(|id| {
            let kind = CreepKind::from_id(id);
            if kind.is_none() {
                warn!("Unknown creep kind '{}' at line {}", id.trim(), line_number);
            }
            kind
        })
        .collect();

    if creeps.is_empty() {
        warn!("No valid creeps at line {}", line_number);
        return None;
    }

    Some(Wave { tick, creeps })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ticks_and_kinds() {
        let waves = parse("25: GHOST, GHOST\n50: troll\n");
        assert_eq!(waves.len(), 2);
        assert_eq!(waves[0].tick, 25);
        assert_eq!(waves[0].creeps, vec![CreepKind::Ghost, CreepKind::Ghost]);
        assert_eq!(waves[1].creeps, vec![CreepKind::Troll]);
    }

    #[test]
    fn skips_comments_blanks_and_malformed_lines() {
        let text = "# opening waves\n\n25: GHOST\nnot a wave\nx: GHOST\n40: NOSUCH\n50: TANK";
        let waves = parse(text);
        assert_eq!(waves.len(), 2);
        assert_eq!(waves[0].tick, 25);
        assert_eq!(waves[1].tick, 50);
    }

    #[test]
    fn unknown_kinds_are_dropped_from_a_wave() {
        let waves = parse("10: GHOST, NOSUCH, RUNNER");
        assert_eq!(
            waves[0].creeps,
            vec![CreepKind::Ghost, CreepKind::Runner]
        );
    }

    #[test]
    fn waves_are_sorted_by_tick() {
        let waves = parse("90: TANK\n10: GHOST\n40: RUNNER");
        let ticks: Vec<u64> = waves.iter().map(|w| w.tick).collect();
        assert_eq!(ticks, vec![10, 40, 90]);
    }
}
