//! Great-circle distance

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres between two (lat, lon) points in degrees
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Round to one decimal place
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        assert_eq!(haversine_km(28.6, 77.2, 28.6, 77.2), 0.0);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let d = haversine_km(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.19).abs() < 0.01);
    }

    #[test]
    fn test_round_tenth() {
        assert_eq!(round_tenth(9.94), 9.9);
        assert_eq!(round_tenth(2.06), 2.1);
    }
}
