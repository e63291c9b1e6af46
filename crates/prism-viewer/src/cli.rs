use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use winit::dpi::LogicalSize;

use prism_engine::effect::MapSlot;
use prism_engine::logging::LoggingConfig;
use prism_engine::mesh::GeometrySource;
use prism_engine::renderer::{RendererConfig, VertexFormat};
use prism_engine::texture::{FilteringMethod, TextureSource};
use prism_engine::window::RuntimeConfig;

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum Mode {
    /// Unlit per-vertex colour cube.
    Color,
    /// Phong-shaded textured mesh plus a transparent quad.
    Textured,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
pub enum Filter {
    Point,
    Linear,
    Anisotropic,
}

impl From<Filter> for FilteringMethod {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::Point => FilteringMethod::Point,
            Filter::Linear => FilteringMethod::Linear,
            Filter::Anisotropic => FilteringMethod::Anisotropic,
        }
    }
}

/// Real-time mesh viewer.
#[derive(Debug, Parser)]
#[command(name = "prism-viewer", version)]
pub struct Args {
    /// Vertex format and effect family.
    #[arg(long, value_enum, default_value_t = Mode::Textured)]
    pub mode: Mode,

    /// OBJ file replacing the default cube.
    #[arg(long, value_name = "OBJ")]
    pub mesh: Option<PathBuf>,

    /// Diffuse map of the opaque mesh.
    #[arg(long, value_name = "IMAGE")]
    pub diffuse: Option<PathBuf>,

    #[arg(long, value_name = "IMAGE")]
    pub normal: Option<PathBuf>,

    #[arg(long, value_name = "IMAGE")]
    pub specular: Option<PathBuf>,

    #[arg(long, value_name = "IMAGE")]
    pub gloss: Option<PathBuf>,

    /// OBJ file replacing the alpha-blended quad.
    #[arg(long, value_name = "OBJ")]
    pub fx_mesh: Option<PathBuf>,

    /// Texture of the alpha-blended mesh (alpha channel is used).
    #[arg(long, value_name = "IMAGE")]
    pub transparent: Option<PathBuf>,

    /// Initial sampler filtering; F4 cycles at runtime.
    #[arg(long, value_enum, default_value_t = Filter::Point)]
    pub filter: Filter,

    /// Start with rotation paused; F5 toggles at runtime.
    #[arg(long)]
    pub no_rotate: bool,

    #[arg(long, default_value_t = 640)]
    pub width: u32,

    #[arg(long, default_value_t = 480)]
    pub height: u32,

    /// env_logger filter, overrides RUST_LOG.
    #[arg(long, value_name = "FILTER")]
    pub log: Option<String>,
}

impl Args {
    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            env_filter: self.log.clone(),
            ..LoggingConfig::default()
        }
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            title: "prism".to_owned(),
            initial_size: LogicalSize::new(self.width as f64, self.height as f64),
        }
    }

    pub fn renderer_config(&self) -> RendererConfig {
        let mut config = RendererConfig {
            vertex_format: match self.mode {
                Mode::Color => VertexFormat::PosCol,
                Mode::Textured => VertexFormat::PosTex,
            },
            rotate: !self.no_rotate,
            filtering: self.filter.into(),
            ..RendererConfig::default()
        };

        let assets = &mut config.assets;
        if let Some(mesh) = &self.mesh {
            assets.pos_col.geometry = GeometrySource::Obj(mesh.clone());
            assets.opaque.geometry = GeometrySource::Obj(mesh.clone());
        }
        if let Some(mesh) = &self.fx_mesh {
            assets.transparent.geometry = GeometrySource::Obj(mesh.clone());
        }

        let maps = [
            (MapSlot::Diffuse, &self.diffuse),
            (MapSlot::Normal, &self.normal),
            (MapSlot::Specular, &self.specular),
            (MapSlot::Glossiness, &self.gloss),
        ];
        for (slot, path) in maps {
            let Some(path) = path else { continue };
            assets.opaque.maps.retain(|(s, _)| *s != slot);
            assets.opaque.maps.push((slot, TextureSource::File(path.clone())));
        }

        if let Some(path) = &self.transparent {
            assets.transparent.maps = vec![(MapSlot::Diffuse, TextureSource::File(path.clone()))];
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("prism-viewer").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults_match_the_engine_defaults() {
        let args = parse(&[]);
        let config = args.renderer_config();

        assert_eq!(config.vertex_format, VertexFormat::PosTex);
        assert_eq!(config.filtering, FilteringMethod::Point);
        assert!(config.rotate);
        assert_eq!(config.assets, RendererConfig::default().assets);

        let runtime = args.runtime_config();
        assert_eq!(runtime.initial_size, LogicalSize::new(640.0, 480.0));
    }

    #[test]
    fn mesh_and_maps_replace_generated_assets() {
        let args = parse(&[
            "--mesh", "chest.obj",
            "--diffuse", "chest_d.png",
            "--gloss", "chest_g.png",
            "--transparent", "smoke.png",
        ]);
        let assets = args.renderer_config().assets;

        assert_eq!(assets.opaque.geometry, GeometrySource::Obj("chest.obj".into()));
        assert_eq!(assets.pos_col.geometry, GeometrySource::Obj("chest.obj".into()));
        assert_eq!(
            assets.opaque.maps,
            vec![
                (MapSlot::Diffuse, TextureSource::File("chest_d.png".into())),
                (MapSlot::Glossiness, TextureSource::File("chest_g.png".into())),
            ]
        );
        assert_eq!(
            assets.transparent.maps,
            vec![(MapSlot::Diffuse, TextureSource::File("smoke.png".into()))]
        );
    }

    #[test]
    fn fx_mesh_replaces_only_the_transparent_quad() {
        let assets = parse(&["--fx-mesh", "smoke.obj"]).renderer_config().assets;
        let defaults = RendererConfig::default().assets;

        assert_eq!(assets.transparent.geometry, GeometrySource::Obj("smoke.obj".into()));
        assert_eq!(assets.transparent.maps, defaults.transparent.maps);
        assert_eq!(assets.opaque, defaults.opaque);
        assert_eq!(assets.pos_col, defaults.pos_col);
    }

    #[test]
    fn color_mode_selects_pos_col_vertices() {
        let config = parse(&["--mode", "color", "--no-rotate", "--filter", "anisotropic"]).renderer_config();
        assert_eq!(config.vertex_format, VertexFormat::PosCol);
        assert_eq!(config.filtering, FilteringMethod::Anisotropic);
        assert!(!config.rotate);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let result = Args::try_parse_from(["prism-viewer", "--mode", "wireframe"]);
        assert!(result.is_err());
    }
}
