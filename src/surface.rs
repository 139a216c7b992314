//! display surfaces: the bits of page state requests are allowed to touch.

use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextSurfaceId {
    Caption,
    Directions,
}

/// a single mutation of display state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceOp {
    SetText(TextSurfaceId, String),
    Clear(TextSurfaceId),
    Show(TextSurfaceId),
    Hide(TextSurfaceId),
    SetMapSource(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextSurface {
    pub text: String,
    pub visible: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapFrame {
    pub src: Option<String>,
}

/// owned by the app; only the drain system writes it.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplaySurfaces {
    pub caption: TextSurface,
    pub directions: TextSurface,
    pub map: MapFrame,
}

impl DisplaySurfaces {
    pub fn text(&self, id: TextSurfaceId) -> &TextSurface {
        match id {
            TextSurfaceId::Caption => &self.caption,
            TextSurfaceId::Directions => &self.directions,
        }
    }

    fn text_mut(&mut self, id: TextSurfaceId) -> &mut TextSurface {
        match id {
            TextSurfaceId::Caption => &mut self.caption,
            TextSurfaceId::Directions => &mut self.directions,
        }
    }

    pub fn apply(&mut self, op: SurfaceOp) {
        match op {
            SurfaceOp::SetText(id, text) => self.text_mut(id).text = text,
            SurfaceOp::Clear(id) => self.text_mut(id).text.clear(),
            SurfaceOp::Show(id) => self.text_mut(id).visible = true,
            SurfaceOp::Hide(id) => self.text_mut(id).visible = false,
            SurfaceOp::SetMapSource(src) => self.map.src = Some(src),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ops_apply_in_order() {
        let mut s = DisplaySurfaces::default();
        for op in [
            SurfaceOp::SetText(TextSurfaceId::Directions, "Calculating...".into()),
            SurfaceOp::Show(TextSurfaceId::Directions),
            SurfaceOp::SetText(TextSurfaceId::Directions, "About 2 hours.".into()),
            SurfaceOp::SetMapSource("https://example.test/map".into()),
        ] {
            s.apply(op);
        }
        assert_eq!(
            s.directions,
            TextSurface { text: "About 2 hours.".into(), visible: true }
        );
        assert_eq!(s.caption, TextSurface::default());
        assert_eq!(s.map.src.as_deref(), Some("https://example.test/map"));

        s.apply(SurfaceOp::Clear(TextSurfaceId::Directions));
        s.apply(SurfaceOp::Hide(TextSurfaceId::Directions));
        assert_eq!(s.text(TextSurfaceId::Directions), &TextSurface::default());
    }
}
