//! Bridging factories from primary-engine values to secondary-engine values.

use crate::core::geo::{LatLng, Point};
use crate::primary::geometry::{Geometry, Shape};
use crate::primary::style::Style;
use crate::secondary::data::{DataGeometry, DataStyle};
use crate::Result;

/// Converts a projected coordinate to the secondary engine's lat/lng terms.
/// Coordinates past the antimeridian (wrapped world copies) come back with
/// the longitude folded into [-180, 180].
pub fn lat_lng(point: &Point) -> LatLng {
    let ll = LatLng::from_mercator(*point);
    LatLng::new(ll.lat, LatLng::wrap_lng(ll.lng))
}

/// Converts a primary geometry to a secondary data geometry
pub fn data_geometry(geometry: &Geometry) -> DataGeometry {
    match geometry.shape() {
        Shape::Point(p) => DataGeometry::Point(lat_lng(&p)),
        Shape::LineString(points) => {
            DataGeometry::Line(points.iter().map(lat_lng).collect())
        }
        Shape::Polygon(rings) => DataGeometry::Polygon(
            rings
                .iter()
                .map(|ring| ring.iter().map(lat_lng).collect())
                .collect(),
        ),
    }
}

/// Converts a primary style to a secondary data style.
///
/// Colors are split into a solid `rgb(...)` string plus a separate opacity
/// because the secondary color API has no alpha channel. Fill and stroke
/// opacities are additionally scaled by the owning layer's opacity. The
/// icon URL is only forwarded when native markers are in use; with canvas
/// icons the marker is drawn by an overlay view instead and the data
/// feature stays icon-less.
pub fn data_style(style: &Style, layer_opacity: f64, canvas_icons: bool) -> Result<DataStyle> {
    let mut out = DataStyle::default();

    if let Some(fill) = &style.fill {
        let color = fill.color.resolve()?;
        out.fill_color = Some(color.to_rgb_string());
        out.fill_opacity = Some(color.opacity() * layer_opacity);
    }
    if let Some(stroke) = &style.stroke {
        let color = stroke.color.resolve()?;
        out.stroke_color = Some(color.to_rgb_string());
        out.stroke_opacity = Some(color.opacity() * layer_opacity);
        out.stroke_width = Some(stroke.width);
    }
    if let Some(icon) = &style.icon {
        if !canvas_icons {
            out.icon_url = Some(icon.src.clone());
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primary::style::Icon;

    #[test]
    fn test_geometry_translation_round_trips_coordinates() {
        let origin = LatLng::new(40.0, -74.0);
        let geom = Geometry::point(origin.to_mercator());

        match data_geometry(&geom) {
            DataGeometry::Point(ll) => {
                assert!((ll.lat - origin.lat).abs() < 1e-9);
                assert!((ll.lng - origin.lng).abs() < 1e-9);
            }
            other => panic!("expected point, got {other:?}"),
        }
    }

    #[test]
    fn test_lng_wraps_across_the_antimeridian() {
        use crate::core::geo::HALF_WORLD;
        // One and a half worlds east of the meridian is 270 degrees, which
        // folds back to -90.
        let ll = lat_lng(&Point::new(HALF_WORLD * 1.5, 0.0));
        assert!((ll.lng - -90.0).abs() < 1e-9);
        assert!(ll.is_valid());
    }

    #[test]
    fn test_polygon_rings_preserved() {
        let ring = vec![
            Point::new(0.0, 0.0),
            Point::new(1000.0, 0.0),
            Point::new(1000.0, 1000.0),
        ];
        let hole = vec![
            Point::new(100.0, 100.0),
            Point::new(200.0, 100.0),
            Point::new(200.0, 200.0),
        ];
        let geom = Geometry::polygon(vec![ring, hole]);

        match data_geometry(&geom) {
            DataGeometry::Polygon(rings) => {
                assert_eq!(rings.len(), 2);
                assert_eq!(rings[0].len(), 3);
            }
            other => panic!("expected polygon, got {other:?}"),
        }
    }

    #[test]
    fn test_style_splits_alpha_from_color() {
        let style = Style::new()
            .with_fill("rgba(10,20,30,0.5)")
            .with_stroke("rgb(1,2,3)", 2.0);

        let data = data_style(&style, 0.8, true).unwrap();
        assert_eq!(data.fill_color.unwrap(), "rgb(10,20,30)");
        assert_eq!(data.fill_opacity.unwrap(), 0.5 * 0.8);
        assert_eq!(data.stroke_color.unwrap(), "rgb(1,2,3)");
        assert_eq!(data.stroke_opacity.unwrap(), 0.8);
        assert_eq!(data.stroke_width.unwrap(), 2.0);
    }

    #[test]
    fn test_icon_url_only_with_native_markers() {
        let style = Style::new().with_icon(Icon::new("pin.png", 16, 16));

        let canvas = data_style(&style, 1.0, true).unwrap();
        assert!(canvas.icon_url.is_none());

        let native = data_style(&style, 1.0, false).unwrap();
        assert_eq!(native.icon_url.unwrap(), "pin.png");
    }

    #[test]
    fn test_bad_color_propagates_error() {
        let style = Style::new().with_fill("not-a-color");
        assert!(data_style(&style, 1.0, true).is_err());
    }
}
