use crate::types::observation::LonLat;

/// Regular `width × height` grid spaced `radius` degrees apart around `center`.
///
/// Longitudes are `center.lon + (i - width/2)·radius` and latitudes
/// `center.lat + (j - height/2)·radius` (integer division), so the center sits at grid index
/// `(width/2, height/2)`. Points are ordered longitude-major.
pub fn grid_points(center: LonLat, radius: f64, width: usize, height: usize) -> Vec<LonLat> {
    let offsets = |n: usize| -> Vec<f64> {
        let half = (n / 2) as i64;
        (0..n as i64).map(|i| (i - half) as f64 * radius).collect()
    };
    let lon_offsets = offsets(width);
    let lat_offsets = offsets(height);

    lon_offsets
        .iter()
        .flat_map(|dlon| {
            lat_offsets
                .iter()
                .map(move |dlat| LonLat(center.lon() + dlon, center.lat() + dlat))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_by_three_grid() {
        let center = LonLat(-80.25, 43.55);
        let points = grid_points(center, 0.1, 3, 3);
        assert_eq!(points.len(), 9);
        // Longitude-major, center at (1, 1).
        assert_eq!(points[4], center);
        assert!((points[0].lon() - (-80.35)).abs() < 1e-9);
        assert!((points[0].lat() - 43.45).abs() < 1e-9);
        assert!((points[1].lon() - (-80.35)).abs() < 1e-9);
        assert!((points[1].lat() - 43.55).abs() < 1e-9);
        assert!((points[8].lon() - (-80.15)).abs() < 1e-9);
        assert!((points[8].lat() - 43.65).abs() < 1e-9);
    }

    #[test]
    fn test_even_and_degenerate_grids() {
        let center = LonLat(0.0, 0.0);
        let points = grid_points(center, 1.0, 4, 1);
        let lons: Vec<f64> = points.iter().map(|p| p.lon()).collect();
        assert_eq!(lons, [-2.0, -1.0, 0.0, 1.0]);
        assert!(points.iter().all(|p| p.lat() == 0.0));

        assert_eq!(grid_points(center, 1.0, 1, 1), vec![center]);
        assert!(grid_points(center, 1.0, 0, 3).is_empty());
    }
}
