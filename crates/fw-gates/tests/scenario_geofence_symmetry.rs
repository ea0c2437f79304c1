use fw_gates::*;
use fw_schemas::GeoPoint;

#[test]
fn scenario_distance_is_symmetric_and_zero_on_self() {
    let points = [
        GeoPoint::new(14.5995, 120.9842),
        GeoPoint::new(14.6042, 120.9822),
        GeoPoint::new(-33.8688, 151.2093),
        GeoPoint::new(51.5074, -0.1278),
        GeoPoint::new(0.0, 179.9999),
        GeoPoint::new(0.0, -179.9999),
    ];

    for a in points {
        assert_eq!(distance_meters(a, a), 0.0);
        for b in points {
            let ab = distance_meters(a, b);
            let ba = distance_meters(b, a);
            assert!((ab - ba).abs() < 1e-6, "asymmetric: {ab} vs {ba}");
        }
    }
}

#[test]
fn scenario_city_scale_point_500m_away_is_outside_100m_fence() {
    let center = GeoPoint::new(14.5995, 120.9842);
    // 500 m due north: 500 / 6_371_000 rad of latitude.
    let dlat = (500.0_f64 / EARTH_RADIUS_M).to_degrees();
    let p = GeoPoint::new(center.lat + dlat, center.lng);

    let d = distance_meters(p, center);
    assert!((d - 500.0).abs() < 1.0, "got {d}");
    assert!(!within_geofence(p, center, DEFAULT_GEOFENCE_RADIUS_M));
    assert!(within_geofence(p, center, 501.0));
}

#[test]
fn scenario_bond_boundary() {
    assert!(can_start_shift(5_000, 5_000));
    assert!(!can_start_shift(4_999, 5_000));
    assert!(can_start_shift(0, 0));
}
