//! Headless backend: fixed-advance font metrics and a recorded draw list
//! behind the same `Canvas` seam the real renderer sits behind. Drives the
//! demo binary and the integration tests.

use crate::color::{strip_color_codes, Color};
use crate::context::{Canvas, ClipRect, CvarStore, CvarValue, FontHandle, TextureHandle};
use rustc_hash::FxHashMap;

#[derive(Clone, Debug)]
struct FontSpec {
    name: String,
    advance: i32,
    height: i32,
}

#[derive(Clone, Debug)]
struct TextureSpec {
    name: String,
    width: i32,
    height: i32,
}

/// One recorded draw call, in issue order.
#[derive(Clone, PartialEq, Debug)]
pub enum DrawOp {
    Text {
        font: String,
        text: String,
        x: i32,
        y: i32,
        color: Color,
        alpha: f32,
        clip: Option<ClipRect>,
    },
    Box {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        color: Color,
        alpha: f32,
    },
    Texture {
        name: String,
        x: i32,
        y: i32,
        alpha: f32,
        clip: Option<ClipRect>,
    },
    TextureCell {
        name: String,
        x: i32,
        y: i32,
        grid: (u32, u32),
        cell: u32,
        alpha: f32,
    },
}

pub struct HeadlessCanvas {
    width: i32,
    height: i32,
    fonts: Vec<FontSpec>,
    fonts_by_name: FxHashMap<String, FontHandle>,
    textures: Vec<TextureSpec>,
    textures_by_name: FxHashMap<String, TextureHandle>,
    pub ops: Vec<DrawOp>,
}

impl HeadlessCanvas {
    pub fn new(width: i32, height: i32) -> Self {
        let mut canvas = Self {
            width,
            height,
            fonts: Vec::new(),
            fonts_by_name: FxHashMap::default(),
            textures: Vec::new(),
            textures_by_name: FxHashMap::default(),
            ops: Vec::new(),
        };
        // Every host ships at least one usable font.
        canvas.register_font("SmallFont", 8, 10);
        canvas
    }

    pub fn register_font(&mut self, name: &str, advance: i32, height: i32) -> FontHandle {
        let handle = FontHandle(self.fonts.len() as u32);
        self.fonts.push(FontSpec {
            name: name.to_string(),
            advance,
            height,
        });
        self.fonts_by_name
            .insert(name.to_ascii_lowercase(), handle);
        handle
    }

    pub fn register_texture(&mut self, name: &str, width: i32, height: i32) -> TextureHandle {
        let handle = TextureHandle(self.textures.len() as u32);
        self.textures.push(TextureSpec {
            name: name.to_string(),
            width,
            height,
        });
        self.textures_by_name
            .insert(name.to_ascii_lowercase(), handle);
        handle
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    fn font_name(&self, font: FontHandle) -> &str {
        self.fonts
            .get(font.0 as usize)
            .map_or("", |f| f.name.as_str())
    }
}

impl Canvas for HeadlessCanvas {
    fn screen_width(&self) -> i32 {
        self.width
    }

    fn screen_height(&self) -> i32 {
        self.height
    }

    fn font(&self, name: &str) -> Option<FontHandle> {
        self.fonts_by_name.get(&name.to_ascii_lowercase()).copied()
    }

    fn font_height(&self, font: FontHandle) -> i32 {
        self.fonts.get(font.0 as usize).map_or(0, |f| f.height)
    }

    fn text_width(&self, font: FontHandle, text: &str) -> i32 {
        let advance = self.fonts.get(font.0 as usize).map_or(0, |f| f.advance);
        strip_color_codes(text).chars().count() as i32 * advance
    }

    fn texture(&self, name: &str) -> Option<TextureHandle> {
        self.textures_by_name
            .get(&name.to_ascii_lowercase())
            .copied()
    }

    fn texture_size(&self, texture: TextureHandle) -> (i32, i32) {
        self.textures
            .get(texture.0 as usize)
            .map_or((0, 0), |t| (t.width, t.height))
    }

    fn draw_text(
        &mut self,
        font: FontHandle,
        text: &str,
        x: i32,
        y: i32,
        color: Color,
        alpha: f32,
        clip: Option<ClipRect>,
    ) {
        let font = self.font_name(font).to_string();
        self.ops.push(DrawOp::Text {
            font,
            text: text.to_string(),
            x,
            y,
            color,
            alpha,
            clip,
        });
    }

    fn draw_box(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color, alpha: f32) {
        self.ops.push(DrawOp::Box {
            x,
            y,
            w,
            h,
            color,
            alpha,
        });
    }

    fn draw_texture(
        &mut self,
        texture: TextureHandle,
        x: i32,
        y: i32,
        alpha: f32,
        clip: Option<ClipRect>,
    ) {
        let name = self
            .textures
            .get(texture.0 as usize)
            .map_or(String::new(), |t| t.name.clone());
        self.ops.push(DrawOp::Texture {
            name,
            x,
            y,
            alpha,
            clip,
        });
    }

    fn draw_texture_cell(
        &mut self,
        texture: TextureHandle,
        x: i32,
        y: i32,
        grid: (u32, u32),
        cell: u32,
        alpha: f32,
    ) {
        let name = self
            .textures
            .get(texture.0 as usize)
            .map_or(String::new(), |t| t.name.clone());
        self.ops.push(DrawOp::TextureCell {
            name,
            x,
            y,
            grid,
            cell,
            alpha,
        });
    }
}

/// Console variables backed by a plain map.
#[derive(Clone, Debug, Default)]
pub struct MapCvars {
    values: FxHashMap<String, CvarValue>,
}

impl MapCvars {
    pub fn set(&mut self, name: &str, value: CvarValue) {
        self.values.insert(name.to_ascii_lowercase(), value);
    }

    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.set(name, CvarValue::Bool(value));
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.set(name, CvarValue::Int(value));
    }
}

impl CvarStore for MapCvars {
    fn get(&self, name: &str) -> Option<CvarValue> {
        self.values.get(&name.to_ascii_lowercase()).cloned()
    }
}
