use crate::config::AnchorConfig;
use crate::ir::{Anchor, PercentBox};

use super::types::Rect;

/// `trunc(extent * pct / 100)`.
pub fn pct_to_emu(pct: f64, extent: i64) -> i64 {
    (extent as f64 * pct / 100.0) as i64
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Default percent box an anchor contributes before explicit fields are applied.
pub fn anchor_defaults(anchor: Option<&Anchor>, config: &AnchorConfig) -> PercentBox {
    let px = config.padding_x_pct.max(0.0);
    let py = config.padding_y_pct.max(0.0);
    let gap = config.gap_pct.max(0.0);
    let half_gap = gap / 2.0;

    let content_w = (100.0 - 2.0 * px).max(0.0);
    let content_h = (100.0 - 2.0 * py).max(0.0);
    let title_h = config.title_height_pct.clamp(0.0, content_h);

    let body_y = py + title_h + gap;
    let body_h = (content_h - title_h - gap).max(0.0);
    let half_w = (content_w / 2.0 - half_gap).max(0.0);
    let half_h = (body_h / 2.0 - half_gap).max(0.0);

    match anchor {
        Some(Anchor::Title) => PercentBox::new(px, py, content_w, title_h),
        Some(Anchor::Left | Anchor::TwoPanelLeft) => PercentBox::new(px, body_y, half_w, body_h),
        Some(Anchor::Right | Anchor::TwoPanelRight) => {
            PercentBox::new(px + content_w - half_w, body_y, half_w, body_h)
        }
        Some(Anchor::Top) => PercentBox::new(px, body_y, content_w, half_h),
        Some(Anchor::Bottom) => PercentBox::new(px, body_y + body_h - half_h, content_w, half_h),
        Some(Anchor::Center) => PercentBox::new(px, py, content_w, content_h),
        Some(Anchor::Other(_)) | None => PercentBox::full(),
    }
}

/// Resolves a component's percent box and anchor into an absolute box inside `parent`.
///
/// Total: missing fields fall back to the anchor's defaults (full parent without an
/// anchor). Width and height are never negative. Left/top are negative only when the
/// caller passed a negative percentage.
pub fn resolve(
    pos: Option<&PercentBox>,
    anchor: Option<&Anchor>,
    parent: Rect,
    config: &AnchorConfig,
) -> Rect {
    let explicit = pos.copied().unwrap_or_default();

    if let Some(side @ (Anchor::TwoPanelLeft | Anchor::TwoPanelRight)) = anchor {
        let (left, right) = two_panel(parent, config);
        let panel = if matches!(side, Anchor::TwoPanelLeft) {
            left
        } else {
            right
        };
        return apply_explicit(panel, &explicit, parent);
    }

    let defaults = anchor_defaults(anchor, config);
    let pick = |value: Option<f64>, fallback: Option<f64>| {
        finite(value).or(fallback).unwrap_or(0.0)
    };
    let x = pick(explicit.x, defaults.x);
    let y = pick(explicit.y, defaults.y);
    let w = pick(explicit.w, defaults.w);
    let h = pick(explicit.h, defaults.h);

    Rect {
        left: parent.left + pct_to_emu(x, parent.width),
        top: parent.top + pct_to_emu(y, parent.height),
        width: pct_to_emu(w, parent.width).max(0),
        height: pct_to_emu(h, parent.height).max(0),
    }
}

/// The two complementary panels of the body area.
///
/// `left.width + gap + right.width` equals the body width exactly and both panels
/// span the full body height.
pub fn two_panel(parent: Rect, config: &AnchorConfig) -> (Rect, Rect) {
    let body_pct = PercentBox {
        w: anchor_defaults(Some(&Anchor::Top), config).w,
        ..anchor_defaults(Some(&Anchor::Left), config)
    };
    let body = Rect {
        left: parent.left + pct_to_emu(body_pct.x.unwrap_or(0.0), parent.width),
        top: parent.top + pct_to_emu(body_pct.y.unwrap_or(0.0), parent.height),
        width: pct_to_emu(body_pct.w.unwrap_or(100.0), parent.width).max(0),
        height: pct_to_emu(body_pct.h.unwrap_or(100.0), parent.height).max(0),
    };
    let gap = pct_to_emu(config.two_panel_gap_pct.max(0.0), parent.width).clamp(0, body.width);
    let left_w = (body.width - gap) / 2;
    let right_w = body.width - gap - left_w;
    let left = Rect::new(body.left, body.top, left_w, body.height);
    let right = Rect::new(body.left + left_w + gap, body.top, right_w, body.height);
    (left, right)
}

fn apply_explicit(mut rect: Rect, explicit: &PercentBox, parent: Rect) -> Rect {
    if let Some(x) = finite(explicit.x) {
        rect.left = parent.left + pct_to_emu(x, parent.width);
    }
    if let Some(y) = finite(explicit.y) {
        rect.top = parent.top + pct_to_emu(y, parent.height);
    }
    if let Some(w) = finite(explicit.w) {
        rect.width = pct_to_emu(w, parent.width);
    }
    if let Some(h) = finite(explicit.h) {
        rect.height = pct_to_emu(h, parent.height);
    }
    rect.width = rect.width.max(0);
    rect.height = rect.height.max(0);
    rect
}
