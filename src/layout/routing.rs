use serde::Serialize;

use crate::config::RoutingConfig;

use super::types::{Point, Rect};

// ── Connection sites ────────────────────────────────────────────────
/// Connection site index on a rectangular shape, numbered the way slide
/// formats number them: top, left, bottom, right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Site {
    Top = 0,
    Left = 1,
    Bottom = 2,
    Right = 3,
}

impl Site {
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn opposite(self) -> Site {
        match self {
            Site::Top => Site::Bottom,
            Site::Bottom => Site::Top,
            Site::Left => Site::Right,
            Site::Right => Site::Left,
        }
    }

    /// Point on `rect` where this site sits.
    pub fn point_on(self, rect: &Rect) -> Point {
        let c = rect.center();
        match self {
            Site::Top => Point::new(c.x, rect.top as f64),
            Site::Bottom => Point::new(c.x, rect.bottom() as f64),
            Site::Left => Point::new(rect.left as f64, c.y),
            Site::Right => Point::new(rect.right() as f64, c.y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStyle {
    Straight,
    Elbow,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConnectorRoute {
    pub start: Point,
    pub end: Point,
    pub begin_site: Site,
    pub end_site: Site,
    pub style: RouteStyle,
}

impl ConnectorRoute {
    /// Bounding box of the two endpoints, truncated to EMU.
    pub fn frame(&self) -> Rect {
        let left = self.start.x.min(self.end.x);
        let top = self.start.y.min(self.end.y);
        let right = self.start.x.max(self.end.x);
        let bottom = self.start.y.max(self.end.y);
        Rect::new(
            left as i64,
            top as i64,
            (right - left) as i64,
            (bottom - top) as i64,
        )
    }
}

// ── Route classification ────────────────────────────────────────────

fn overlaps_horizontally(a: &Rect, b: &Rect) -> bool {
    !(a.right() <= b.left || b.right() <= a.left)
}

fn overlaps_vertically(a: &Rect, b: &Rect) -> bool {
    !(a.bottom() <= b.top || b.bottom() <= a.top)
}

/// Chooses endpoints, sites and style for a connector from `from` to `to`.
///
/// Boxes that sit side by side (centers within `align_ratio` of their summed
/// extent on the cross axis and no overlap on the main axis) get a straight
/// edge-to-edge connector pushed out by `margin`. Everything else gets an elbow
/// between the centers, leaving through the side facing the dominant axis.
pub fn route(from: &Rect, to: &Rect, margin: i64, config: &RoutingConfig) -> ConnectorRoute {
    let f = from.center();
    let t = to.center();
    let dx = (t.x - f.x).abs();
    let dy = (t.y - f.y).abs();
    let margin = margin as f64;
    let ratio = config.align_ratio;

    let horizontally_aligned = dy < (from.height + to.height) as f64 * ratio;
    if horizontally_aligned && !overlaps_horizontally(from, to) {
        return if from.right() <= to.left {
            ConnectorRoute {
                start: Point::new(from.right() as f64 + margin, f.y),
                end: Point::new(to.left as f64 - margin, t.y),
                begin_site: Site::Right,
                end_site: Site::Left,
                style: RouteStyle::Straight,
            }
        } else {
            ConnectorRoute {
                start: Point::new(from.left as f64 - margin, f.y),
                end: Point::new(to.right() as f64 + margin, t.y),
                begin_site: Site::Left,
                end_site: Site::Right,
                style: RouteStyle::Straight,
            }
        };
    }

    let vertically_aligned = dx < (from.width + to.width) as f64 * ratio;
    if vertically_aligned && !overlaps_vertically(from, to) {
        return if from.bottom() <= to.top {
            ConnectorRoute {
                start: Point::new(f.x, from.bottom() as f64 + margin),
                end: Point::new(t.x, to.top as f64 - margin),
                begin_site: Site::Bottom,
                end_site: Site::Top,
                style: RouteStyle::Straight,
            }
        } else {
            ConnectorRoute {
                start: Point::new(f.x, from.top as f64 - margin),
                end: Point::new(t.x, to.bottom() as f64 + margin),
                begin_site: Site::Top,
                end_site: Site::Bottom,
                style: RouteStyle::Straight,
            }
        };
    }

    let (begin_site, end_site) = if dx >= dy {
        if t.x > f.x {
            (Site::Right, Site::Left)
        } else {
            (Site::Left, Site::Right)
        }
    } else if t.y > f.y {
        (Site::Bottom, Site::Top)
    } else {
        (Site::Top, Site::Bottom)
    };
    ConnectorRoute {
        start: f,
        end: t,
        begin_site,
        end_site,
        style: RouteStyle::Elbow,
    }
}

/// Polyline for drawing: two points for straight routes, a three-segment
/// orthogonal path for elbows.
pub fn polyline(route: &ConnectorRoute) -> Vec<Point> {
    match route.style {
        RouteStyle::Straight => vec![route.start, route.end],
        RouteStyle::Elbow => {
            let (s, e) = (route.start, route.end);
            if matches!(route.begin_site, Site::Left | Site::Right) {
                let mid_x = (s.x + e.x) / 2.0;
                vec![s, Point::new(mid_x, s.y), Point::new(mid_x, e.y), e]
            } else {
                let mid_y = (s.y + e.y) / 2.0;
                vec![s, Point::new(s.x, mid_y), Point::new(e.x, mid_y), e]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> RoutingConfig {
        RoutingConfig::default()
    }

    #[test]
    fn side_by_side_boxes_route_straight_right_to_left() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(300, 10, 100, 100);
        let r = route(&a, &b, 0, &cfg());
        assert_eq!(r.style, RouteStyle::Straight);
        assert_eq!((r.begin_site, r.end_site), (Site::Right, Site::Left));
        assert_eq!(r.start, Point::new(100.0, 50.0));
        assert_eq!(r.end, Point::new(300.0, 60.0));
    }

    #[test]
    fn margin_pushes_endpoints_outward() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(300, 0, 100, 100);
        let r = route(&a, &b, 5, &cfg());
        assert_eq!(r.start.x, 105.0);
        assert_eq!(r.end.x, 295.0);
    }

    #[test]
    fn stacked_boxes_route_straight_bottom_to_top() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(20, 400, 100, 100);
        let r = route(&a, &b, 0, &cfg());
        assert_eq!(r.style, RouteStyle::Straight);
        assert_eq!((r.begin_site, r.end_site), (Site::Bottom, Site::Top));
        assert_eq!(r.start, Point::new(50.0, 100.0));
        assert_eq!(r.end, Point::new(70.0, 400.0));

        let back = route(&b, &a, 0, &cfg());
        assert_eq!((back.begin_site, back.end_site), (Site::Top, Site::Bottom));
    }

    #[test]
    fn separated_cases_are_mirror_symmetric() {
        let pairs = [
            (Rect::new(0, 0, 100, 100), Rect::new(300, 0, 100, 100)),
            (Rect::new(0, 0, 100, 100), Rect::new(0, 300, 100, 100)),
            (Rect::new(0, 0, 100, 100), Rect::new(500, 900, 80, 60)),
        ];
        for (a, b) in pairs {
            let fwd = route(&a, &b, 0, &cfg());
            let back = route(&b, &a, 0, &cfg());
            assert_eq!(fwd.style, back.style);
            assert_eq!(fwd.begin_site, back.end_site);
            assert_eq!(fwd.end_site, back.begin_site);
            assert_eq!(fwd.begin_site.opposite(), fwd.end_site);
        }
    }

    #[test]
    fn diagonal_boxes_get_an_elbow_on_the_dominant_axis() {
        let a = Rect::new(0, 0, 100, 100);
        let wide = route(&a, &Rect::new(1000, 400, 100, 100), 0, &cfg());
        assert_eq!(wide.style, RouteStyle::Elbow);
        assert_eq!((wide.begin_site, wide.end_site), (Site::Right, Site::Left));
        assert_eq!(wide.start, a.center());

        let tall = route(&a, &Rect::new(-400, -1000, 100, 100), 0, &cfg());
        assert_eq!(tall.style, RouteStyle::Elbow);
        assert_eq!((tall.begin_site, tall.end_site), (Site::Top, Site::Bottom));
    }

    #[test]
    fn identical_centers_are_elbow() {
        let a = Rect::new(0, 0, 100, 100);
        let r = route(&a, &a, 0, &cfg());
        assert_eq!(r.style, RouteStyle::Elbow);
        assert_eq!((r.begin_site, r.end_site), (Site::Left, Site::Right));
    }

    #[test]
    fn align_ratio_is_tunable() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(300, 80, 100, 100);
        assert_eq!(route(&a, &b, 0, &cfg()).style, RouteStyle::Elbow);
        let loose = RoutingConfig {
            align_ratio: 0.5,
            ..cfg()
        };
        assert_eq!(route(&a, &b, 0, &loose).style, RouteStyle::Straight);
    }

    #[test]
    fn site_indices_follow_slide_numbering() {
        assert_eq!(Site::Top.index(), 0);
        assert_eq!(Site::Left.index(), 1);
        assert_eq!(Site::Bottom.index(), 2);
        assert_eq!(Site::Right.index(), 3);
    }

    #[test]
    fn elbow_polyline_is_orthogonal() {
        let r = route(&Rect::new(0, 0, 100, 100), &Rect::new(1000, 400, 100, 100), 0, &cfg());
        let pts = polyline(&r);
        assert_eq!(pts.len(), 4);
        assert!(pts.windows(2).all(|w| w[0].x == w[1].x || w[0].y == w[1].y));
    }
}
