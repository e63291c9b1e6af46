//! Textures and sampler states.
//!
//! Textures are plain RGBA8, single mip level. Meshes reference textures
//! through their `TextureId`; the renderer owns them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Largest edge of a generated (checkerboard, flame) texture.
pub const MAX_GENERATED_SIZE: u32 = 8192;

/// Byte length of a `width`×`height` RGBA8 image.
fn rgba_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to decode texture '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("texture '{label}' is {width}x{height}; at most {max}x{max} is allowed")]
    TooLarge {
        label: String,
        width: u32,
        height: u32,
        max: u32,
    },

    #[error("texture '{label}' has no pixels")]
    Empty { label: String },

    #[error("texture '{label}' holds {actual} bytes; {width}x{height} RGBA8 needs {expected}")]
    PixelCount {
        label: String,
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Decoded RGBA8 pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// Validates the extent against `max` and the pixel buffer against the extent.
    pub fn check_dimensions(&self, max: u32) -> Result<(), TextureError> {
        if self.width == 0 || self.height == 0 {
            return Err(TextureError::Empty {
                label: self.label.clone(),
            });
        }
        if self.width > max || self.height > max {
            return Err(TextureError::TooLarge {
                label: self.label.clone(),
                width: self.width,
                height: self.height,
                max,
            });
        }
        let expected = rgba_len(self.width, self.height);
        if self.pixels.len() != expected {
            return Err(TextureError::PixelCount {
                label: self.label.clone(),
                width: self.width,
                height: self.height,
                expected,
                actual: self.pixels.len(),
            });
        }
        Ok(())
    }

    pub fn from_file(path: &Path) -> Result<Self, TextureError> {
        let image = image::open(path)
            .map_err(|source| TextureError::Decode {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();

        let (width, height) = image.dimensions();
        Ok(Self {
            label: path.display().to_string(),
            width,
            height,
            pixels: image.into_raw(),
        })
    }

    /// 1x1 texture of a single colour.
    pub fn solid(label: impl Into<String>, rgba: [u8; 4]) -> Self {
        Self {
            label: label.into(),
            width: 1,
            height: 1,
            pixels: rgba.to_vec(),
        }
    }

    pub fn checkerboard(size: u32, cells: u32, a: [u8; 4], b: [u8; 4]) -> Self {
        let cell = (size / cells.max(1)).max(1);
        let mut pixels = Vec::with_capacity(rgba_len(size, size));
        for y in 0..size {
            for x in 0..size {
                let even = ((x / cell) + (y / cell)) % 2 == 0;
                pixels.extend_from_slice(if even { &a } else { &b });
            }
        }
        Self {
            label: "checkerboard".to_owned(),
            width: size,
            height: size,
            pixels,
        }
    }

    /// Translucent flame-coloured gradient for billboard quads.
    ///
    /// Opaque yellow at the bottom centre fading to transparent red at the
    /// top and the sides.
    pub fn flame(size: u32) -> Self {
        let mut pixels = Vec::with_capacity(rgba_len(size, size));
        let extent = (size.max(2) - 1) as f32;
        for y in 0..size {
            // 0 on the top row, 1 on the bottom row.
            let heat = y as f32 / extent;
            for x in 0..size {
                let across = (x as f32 / extent - 0.5).abs() * 2.0;
                let falloff = (1.0 - across * across).max(0.0);
                let alpha = heat * falloff;
                pixels.extend_from_slice(&[
                    255,
                    (64.0 + 191.0 * heat) as u8,
                    (32.0 * heat) as u8,
                    (255.0 * alpha) as u8,
                ]);
            }
        }
        Self {
            label: "flame".to_owned(),
            width: size,
            height: size,
            pixels,
        }
    }
}

/// Where a texture comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum TextureSource {
    File(PathBuf),
    Solid([u8; 4]),
    Checkerboard { size: u32, cells: u32 },
    Flame { size: u32 },
}

impl TextureSource {
    /// Decodes or generates the pixels.
    ///
    /// Generated textures larger than [`MAX_GENERATED_SIZE`] are rejected
    /// before any pixel is allocated.
    pub fn load(&self) -> Result<TextureData, TextureError> {
        if let TextureSource::Checkerboard { size, .. } | TextureSource::Flame { size } = self {
            if *size > MAX_GENERATED_SIZE {
                return Err(TextureError::TooLarge {
                    label: self.label(),
                    width: *size,
                    height: *size,
                    max: MAX_GENERATED_SIZE,
                });
            }
        }

        Ok(match self {
            TextureSource::File(path) => TextureData::from_file(path)?,
            TextureSource::Solid(rgba) => TextureData::solid("solid", *rgba),
            TextureSource::Checkerboard { size, cells } => {
                TextureData::checkerboard(*size, *cells, [200, 200, 200, 255], [60, 60, 60, 255])
            }
            TextureSource::Flame { size } => TextureData::flame(*size),
        })
    }

    fn label(&self) -> String {
        match self {
            TextureSource::File(path) => path.display().to_string(),
            TextureSource::Solid(_) => "solid".to_owned(),
            TextureSource::Checkerboard { .. } => "checkerboard".to_owned(),
            TextureSource::Flame { .. } => "flame".to_owned(),
        }
    }
}

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an uploaded texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureId(u64);

impl TextureId {
    pub(crate) fn next() -> Self {
        Self(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// GPU texture plus its default view.
#[derive(Debug)]
pub struct Texture {
    id: TextureId,
    label: String,
    view: wgpu::TextureView,
    texture: wgpu::Texture,
}

impl Texture {
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &TextureData,
    ) -> Result<Self, TextureError> {
        data.check_dimensions(device.limits().max_texture_dimension_2d)?;

        let size = wgpu::Extent3d {
            width: data.width,
            height: data.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&data.label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &data.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(data.width * 4),
                rows_per_image: Some(data.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self {
            id: TextureId::next(),
            label: data.label.clone(),
            view,
            texture,
        })
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn size(&self) -> (u32, u32) {
        (self.texture.width(), self.texture.height())
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

/// Texture filtering used by the bound sampler.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum FilteringMethod {
    #[default]
    Point,
    Linear,
    Anisotropic,
}

impl FilteringMethod {
    pub const ALL: [FilteringMethod; 3] = [
        FilteringMethod::Point,
        FilteringMethod::Linear,
        FilteringMethod::Anisotropic,
    ];

    /// Point → Linear → Anisotropic → Point.
    pub fn next(self) -> Self {
        match self {
            FilteringMethod::Point => FilteringMethod::Linear,
            FilteringMethod::Linear => FilteringMethod::Anisotropic,
            FilteringMethod::Anisotropic => FilteringMethod::Point,
        }
    }
}

impl fmt::Display for FilteringMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FilteringMethod::Point => "POINT",
            FilteringMethod::Linear => "LINEAR",
            FilteringMethod::Anisotropic => "ANISOTROPIC",
        })
    }
}

pub const MAX_ANISOTROPY: u16 = 16;

pub fn sampler_descriptor(method: FilteringMethod) -> wgpu::SamplerDescriptor<'static> {
    let (filter, mipmap_filter, anisotropy_clamp) = match method {
        FilteringMethod::Point => (wgpu::FilterMode::Nearest, wgpu::MipmapFilterMode::Nearest, 1),
        FilteringMethod::Linear => (wgpu::FilterMode::Linear, wgpu::MipmapFilterMode::Linear, 1),
        // Anisotropy requires linear filtering on every axis.
        FilteringMethod::Anisotropic => (
            wgpu::FilterMode::Linear,
            wgpu::MipmapFilterMode::Linear,
            MAX_ANISOTROPY,
        ),
    };

    wgpu::SamplerDescriptor {
        label: Some(match method {
            FilteringMethod::Point => "prism point sampler",
            FilteringMethod::Linear => "prism linear sampler",
            FilteringMethod::Anisotropic => "prism anisotropic sampler",
        }),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter,
        anisotropy_clamp,
        ..Default::default()
    }
}

/// A created sampler tagged with the filtering it implements.
#[derive(Debug)]
pub struct SamplerState {
    method: FilteringMethod,
    sampler: wgpu::Sampler,
}

impl SamplerState {
    pub fn new(device: &wgpu::Device, method: FilteringMethod) -> Self {
        Self {
            method,
            sampler: device.create_sampler(&sampler_descriptor(method)),
        }
    }

    pub fn method(&self) -> FilteringMethod {
        self.method
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}

/// One sampler per filtering method, created once.
#[derive(Debug)]
pub struct SamplerSet {
    samplers: [SamplerState; 3],
}

impl SamplerSet {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            samplers: FilteringMethod::ALL.map(|method| SamplerState::new(device, method)),
        }
    }

    pub fn get(&self, method: FilteringMethod) -> &SamplerState {
        match method {
            FilteringMethod::Point => &self.samplers[0],
            FilteringMethod::Linear => &self.samplers[1],
            FilteringMethod::Anisotropic => &self.samplers[2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filtering_cycles_through_all_methods() {
        let mut method = FilteringMethod::default();
        assert_eq!(method, FilteringMethod::Point);
        method = method.next();
        assert_eq!(method, FilteringMethod::Linear);
        method = method.next();
        assert_eq!(method, FilteringMethod::Anisotropic);
        method = method.next();
        assert_eq!(method, FilteringMethod::Point);
    }

    #[test]
    fn filtering_names_are_upper_case() {
        let names: Vec<String> = FilteringMethod::ALL.iter().map(|m| m.to_string()).collect();
        assert_eq!(names, ["POINT", "LINEAR", "ANISOTROPIC"]);
    }

    #[test]
    fn sampler_descriptors_match_their_method() {
        let point = sampler_descriptor(FilteringMethod::Point);
        assert_eq!(point.min_filter, wgpu::FilterMode::Nearest);
        assert_eq!(point.anisotropy_clamp, 1);

        let linear = sampler_descriptor(FilteringMethod::Linear);
        assert_eq!(linear.mag_filter, wgpu::FilterMode::Linear);
        assert_eq!(linear.anisotropy_clamp, 1);

        let aniso = sampler_descriptor(FilteringMethod::Anisotropic);
        assert_eq!(aniso.anisotropy_clamp, MAX_ANISOTROPY);
        assert_eq!(aniso.mipmap_filter, wgpu::MipmapFilterMode::Linear);
        assert_eq!(aniso.address_mode_u, wgpu::AddressMode::Repeat);
    }

    #[test]
    fn generated_textures_have_rgba_pixels() {
        let checker = TextureData::checkerboard(8, 2, [255; 4], [0, 0, 0, 255]);
        assert_eq!(checker.pixels.len(), 8 * 8 * 4);
        assert_eq!(&checker.pixels[0..4], &[255; 4]);
        // First pixel of the second cell on row 0.
        assert_eq!(&checker.pixels[16..20], &[0, 0, 0, 255]);

        let flame = TextureData::flame(16);
        assert_eq!(flame.pixels.len(), 16 * 16 * 4);
        let alpha = |x: usize, y: usize| flame.pixels[(y * 16 + x) * 4 + 3];
        assert_eq!(alpha(8, 0), 0);
        assert!(alpha(8, 15) > 200);
        assert!(alpha(0, 15) < alpha(8, 15));
    }

    #[test]
    fn oversized_generated_textures_are_rejected_before_allocation() {
        // 70000² RGBA pixels overflow u32 byte arithmetic.
        for source in [
            TextureSource::Checkerboard { size: 70_000, cells: 8 },
            TextureSource::Flame { size: 70_000 },
        ] {
            match source.load() {
                Err(TextureError::TooLarge { width, max, .. }) => {
                    assert_eq!(width, 70_000);
                    assert_eq!(max, MAX_GENERATED_SIZE);
                }
                other => panic!("expected TooLarge, got {other:?}"),
            }
        }

        let edge = TextureSource::Flame { size: 4 }.load().unwrap();
        assert_eq!(edge.pixels.len(), rgba_len(4, 4));
    }

    #[test]
    fn upload_dimensions_are_checked() {
        let mut data = TextureData::checkerboard(8, 2, [255; 4], [0; 4]);
        assert!(data.check_dimensions(8).is_ok());
        assert!(matches!(data.check_dimensions(4), Err(TextureError::TooLarge { max: 4, .. })));

        data.pixels.truncate(10);
        match data.check_dimensions(8) {
            Err(TextureError::PixelCount { expected, actual, .. }) => {
                assert_eq!(expected, 256);
                assert_eq!(actual, 10);
            }
            other => panic!("expected PixelCount, got {other:?}"),
        }

        let empty = TextureData { width: 0, ..TextureData::solid("empty", [0; 4]) };
        assert!(matches!(empty.check_dimensions(8), Err(TextureError::Empty { .. })));
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let err = TextureData::from_file(Path::new("missing/diffuse.png")).unwrap_err();
        assert!(matches!(err, TextureError::Decode { .. }));
    }
}
