#[derive(Debug, PartialEq, Eq)]
pub struct SensorGroups {
    pub outside: String,
    pub inside: String,
    pub hive: String,
}

const OUTSIDE_PREFIX: &str = "DHT1";
const INSIDE_PREFIX: &str = "DHT2";
const HIVE_PREFIX: &str = "SHT";

/// Splits a raw sensor line on commas and groups the pieces by sensor-unit
/// prefix. Pieces matching no known prefix are dropped; a bucket with no
/// matching piece stays empty.
pub fn parse_sensor_line(raw: &str) -> SensorGroups {
    let pieces: Vec<&str> = raw.split(',').map(str::trim).collect();

    let bucket = |prefix: &str| {
        pieces
            .iter()
            .filter(|piece| piece.starts_with(prefix))
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    };

    SensorGroups {
        outside: bucket(OUTSIDE_PREFIX),
        inside: bucket(INSIDE_PREFIX),
        hive: bucket(HIVE_PREFIX),
    }
}
