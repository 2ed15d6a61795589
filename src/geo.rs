const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres, or `None` when a coordinate is missing.
pub fn distance_km(
    lat1: Option<f64>,
    lon1: Option<f64>,
    lat2: Option<f64>,
    lon2: Option<f64>,
) -> Option<f64> {
    let (lat1, lon1, lat2, lon2) = (lat1?, lon1?, lat2?, lon2?);

    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    let distance = EARTH_RADIUS_KM * c;

    if distance.is_finite() {
        Some(distance)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_point_is_zero() {
        for (lat, lon) in [(0.0, 0.0), (19.076, 72.8777), (-33.86, 151.2), (89.9, -179.9)] {
            assert_eq!(distance_km(Some(lat), Some(lon), Some(lat), Some(lon)), Some(0.0));
        }
    }

    #[test]
    fn missing_coordinate_is_none() {
        assert_eq!(distance_km(None, Some(1.0), Some(2.0), Some(3.0)), None);
        assert_eq!(distance_km(Some(1.0), None, Some(2.0), Some(3.0)), None);
        assert_eq!(distance_km(Some(1.0), Some(1.0), None, Some(3.0)), None);
        assert_eq!(distance_km(Some(1.0), Some(1.0), Some(2.0), None), None);
    }

    #[test]
    fn non_finite_is_none() {
        assert_eq!(distance_km(Some(f64::NAN), Some(0.0), Some(0.0), Some(0.0)), None);
    }

    #[test]
    fn symmetric() {
        let mumbai = (Some(19.076), Some(72.8777));
        let pune = (Some(18.5204), Some(73.8567));
        let there = distance_km(mumbai.0, mumbai.1, pune.0, pune.1).unwrap();
        let back = distance_km(pune.0, pune.1, mumbai.0, mumbai.1).unwrap();
        assert!((there - back).abs() < 1e-9);
        // Mumbai to Pune is roughly 120 km as the crow flies.
        assert!((110.0..130.0).contains(&there), "{}", there);
    }
}
