use axum::{
    extract::Query,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::{error, info};

use harmonics::config::RenderConfig;
use harmonics::error::{HarmonicError, RenderError};
use harmonics::physics::QuantumNumbers;
use harmonics::render::{encode_png, rasterize};
use harmonics::surface::{render, AngularGrid, ContourProjection, Normalization, Surface};
use harmonics::telemetry::init_tracing;

/// Upper bound on grid density served over HTTP.
const MAX_WEB_RESOLUTION: usize = 400;

/// Highest degree served over HTTP. Evaluation cost grows linearly in l per
/// grid point.
const MAX_WEB_DEGREE: i64 = 100;

#[derive(Parser, Debug)]
#[command(name = "harmonics-web", about = "Browser viewer for real spherical harmonics")]
struct WebCli {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: SocketAddr,
}

#[derive(Deserialize, Debug, Default)]
struct SurfaceQuery {
    l: Option<i64>,
    m: Option<i64>,
    theta_resolution: Option<usize>,
    phi_resolution: Option<usize>,
    view_extent: Option<f64>,
    contour_levels: Option<usize>,
    alpha: Option<f32>,
    size: Option<u32>,
}

impl SurfaceQuery {
    fn resolve(&self) -> Result<(QuantumNumbers, RenderConfig), HarmonicError> {
        let l = self.l.unwrap_or(1);
        if l > MAX_WEB_DEGREE {
            return Err(HarmonicError::InvalidQuantumNumber(format!(
                "L must be at most {MAX_WEB_DEGREE}"
            )));
        }
        let qn = QuantumNumbers::new(l, self.m.unwrap_or(0))?;
        let defaults = RenderConfig::default();
        let config = RenderConfig {
            theta_resolution: self
                .theta_resolution
                .unwrap_or(defaults.theta_resolution)
                .min(MAX_WEB_RESOLUTION),
            phi_resolution: self
                .phi_resolution
                .unwrap_or(defaults.phi_resolution)
                .min(MAX_WEB_RESOLUTION),
            view_extent: self.view_extent.unwrap_or(defaults.view_extent),
            contour_levels: self.contour_levels.unwrap_or(defaults.contour_levels),
            surface_alpha: self.alpha.unwrap_or(defaults.surface_alpha),
            image_size: self.size.unwrap_or(defaults.image_size),
        }
        .clamped();
        Ok((qn, config))
    }
}

#[derive(Serialize)]
struct SurfaceResponse {
    l: u32,
    m: i32,
    label: String,
    shape: [usize; 2],
    view_extent: f64,
    max_radius: f64,
    normalization: Normalization,
    vertices: Vec<[f32; 3]>,
    colors: Vec<f32>,
    rgba: Vec<[f32; 4]>,
    projections: Vec<ContourProjection>,
}

impl SurfaceResponse {
    fn from_surface(surface: Surface) -> Self {
        let qn = surface.quantum_numbers;
        let (rows, cols) = surface.shape();
        let vertices = surface
            .vertices()
            .into_iter()
            .map(|p| p.map(|c| c as f32))
            .collect();
        SurfaceResponse {
            l: qn.l,
            m: qn.m,
            label: qn.label(),
            shape: [rows, cols],
            view_extent: surface.view_extent,
            max_radius: surface.max_radius(),
            normalization: surface.normalization,
            vertices,
            colors: surface.colors.iter().map(|&c| c as f32).collect(),
            rgba: surface.rgba.iter().copied().collect(),
            projections: surface.projections,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorBody { error: message })).into_response()
}

fn build_surface(qn: QuantumNumbers, config: &RenderConfig) -> Surface {
    let grid = AngularGrid::from_config(config);
    render(qn, &grid, config)
}

fn build_png(qn: QuantumNumbers, config: &RenderConfig) -> Result<Vec<u8>, RenderError> {
    let surface = build_surface(qn, config);
    encode_png(&rasterize(&surface, config))
}

async fn index() -> impl IntoResponse {
    Html(INDEX_HTML)
}

async fn surface(Query(q): Query<SurfaceQuery>) -> Response {
    let (qn, config) = match q.resolve() {
        Ok(resolved) => resolved,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let result = tokio::task::spawn_blocking(move || {
        SurfaceResponse::from_surface(build_surface(qn, &config))
    })
    .await;

    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            error!("surface task failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "surface task failed".to_string())
        }
    }
}

async fn render_png(Query(q): Query<SurfaceQuery>) -> Response {
    let (qn, config) = match q.resolve() {
        Ok(resolved) => resolved,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match tokio::task::spawn_blocking(move || build_png(qn, &config)).await {
        Ok(Ok(bytes)) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        Ok(Err(e)) => {
            error!("png encoding failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => {
            error!("render task failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "render task failed".to_string())
        }
    }
}

fn router() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/surface", get(surface))
        .route("/render.png", get(render_png))
}

#[tokio::main]
async fn main() {
    let cli = WebCli::parse();
    init_tracing();

    let listener = match tokio::net::TcpListener::bind(cli.addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Error: cannot bind {}: {}", cli.addr, e);
            std::process::exit(1);
        }
    };
    info!("Serving on http://{}", cli.addr);
    if let Err(e) = axum::serve(listener, router()).await {
        eprintln!("Error: server stopped: {}", e);
        std::process::exit(1);
    }
}

const INDEX_HTML: &str = r##"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Spherical Harmonics 3D</title>
    <style>
      html, body { margin: 0; padding: 0; height: 100%; background: #ffffff; color: #1d232b; font-family: "Segoe UI", sans-serif; }
      canvas { display: block; }
      #panel { position: absolute; top: 12px; left: 12px; width: 280px; background: rgba(248,249,251,0.94); padding: 12px; border: 1px solid #d5dae1; border-radius: 10px; box-shadow: 0 6px 18px rgba(0,0,0,0.12); }
      .brand { font-size: 16px; font-weight: 600; }
      .row { display: flex; align-items: center; gap: 6px; margin-top: 8px; flex-wrap: wrap; }
      .row label { font-size: 11px; color: #55606d; min-width: 24px; }
      input { background: #fff; color: #1d232b; border: 1px solid #c4cbd4; border-radius: 6px; padding: 4px 6px; font-size: 12px; width: 58px; }
      button, a.button { background: #eef2f7; color: #1d232b; border: 1px solid #c4cbd4; border-radius: 6px; padding: 6px 10px; font-size: 12px; cursor: pointer; text-decoration: none; }
      button.primary { background: #dbe8f7; border-color: #6f9ccc; }
      #status { margin-top: 8px; font-size: 12px; color: #55606d; }
      #status.error { color: #b3261e; }
    </style>
  </head>
  <body>
    <div id="panel">
      <div class="brand">Real Spherical Harmonics</div>
      <div class="row">
        <label>l</label><input id="l" type="number" min="0" max="100" value="1" />
        <label>m</label><input id="m" type="number" value="0" />
      </div>
      <div class="row">
        <label>θ res</label><input id="thetaRes" type="number" min="2" max="400" value="200" />
        <label>φ res</label><input id="phiRes" type="number" min="2" max="400" value="200" />
      </div>
      <div class="row">
        <label>extent</label><input id="extent" type="number" min="0.1" step="0.1" value="1.0" />
        <label>levels</label><input id="levels" type="number" min="0" max="64" value="8" />
      </div>
      <div class="row">
        <button id="go" class="primary">Plot</button>
        <a id="png" class="button" href="/render.png" target="_blank">PNG</a>
      </div>
      <div id="status">Ready.</div>
    </div>
    <script type="importmap">
      {
        "imports": {
          "three": "https://unpkg.com/three@0.160.0/build/three.module.js",
          "three/addons/": "https://unpkg.com/three@0.160.0/examples/jsm/"
        }
      }
    </script>
    <script type="module">
      import * as THREE from "three";
      import { OrbitControls } from "three/addons/controls/OrbitControls.js";

      const statusEl = document.getElementById("status");
      const renderer = new THREE.WebGLRenderer({ antialias: true });
      renderer.setPixelRatio(window.devicePixelRatio);
      renderer.setSize(window.innerWidth, window.innerHeight);
      renderer.setClearColor(0xffffff);
      document.body.appendChild(renderer.domElement);

      const scene = new THREE.Scene();
      const camera = new THREE.PerspectiveCamera(40, window.innerWidth / window.innerHeight, 0.01, 100);
      camera.up.set(0, 0, 1);
      camera.position.set(2.6, -4.5, 3.0);
      const controls = new OrbitControls(camera, renderer.domElement);

      let group = new THREE.Group();
      scene.add(group);

      function query() {
        const params = new URLSearchParams({
          l: document.getElementById("l").value,
          m: document.getElementById("m").value,
          theta_resolution: document.getElementById("thetaRes").value,
          phi_resolution: document.getElementById("phiRes").value,
          view_extent: document.getElementById("extent").value,
          contour_levels: document.getElementById("levels").value,
        });
        return params.toString();
      }

      function buildSurface(data) {
        const [rows, cols] = data.shape;
        const positions = new Float32Array(data.vertices.flat());
        const colors = new Float32Array(data.rgba.flat());
        const indices = [];
        for (let j = 0; j < rows - 1; j++) {
          for (let i = 0; i < cols - 1; i++) {
            const a = j * cols + i, b = a + 1, c = a + cols, d = c + 1;
            indices.push(a, b, c, d, c, b);
          }
        }
        const geometry = new THREE.BufferGeometry();
        geometry.setAttribute("position", new THREE.BufferAttribute(positions, 3));
        geometry.setAttribute("color", new THREE.BufferAttribute(colors, 4));
        geometry.setIndex(indices);
        const material = new THREE.MeshBasicMaterial({
          vertexColors: true, transparent: true, side: THREE.DoubleSide, depthWrite: false,
        });
        return new THREE.Mesh(geometry, material);
      }

      function buildContours(projection) {
        const positions = [];
        const colors = [];
        for (const line of projection.lines) {
          for (const [a, b] of line.segments) {
            positions.push(...a, ...b);
            colors.push(...line.color, ...line.color);
          }
        }
        const geometry = new THREE.BufferGeometry();
        geometry.setAttribute("position", new THREE.Float32BufferAttribute(positions, 3));
        geometry.setAttribute("color", new THREE.Float32BufferAttribute(colors, 3));
        return new THREE.LineSegments(geometry, new THREE.LineBasicMaterial({ vertexColors: true }));
      }

      function buildCube(extent) {
        const box = new THREE.BoxGeometry(2 * extent, 2 * extent, 2 * extent);
        const edges = new THREE.EdgesGeometry(box);
        return new THREE.LineSegments(edges, new THREE.LineBasicMaterial({ color: 0xbfbfbf }));
      }

      async function plot() {
        const q = query();
        document.getElementById("png").href = "/render.png?" + q;
        statusEl.className = "";
        statusEl.textContent = "Computing...";
        const res = await fetch("/surface?" + q);
        const data = await res.json();
        if (!res.ok) {
          statusEl.className = "error";
          statusEl.textContent = data.error;
          return;
        }
        scene.remove(group);
        group = new THREE.Group();
        group.add(buildCube(data.view_extent));
        for (const projection of data.projections) {
          group.add(buildContours(projection));
        }
        group.add(buildSurface(data));
        scene.add(group);
        statusEl.textContent = `${data.label}: ${data.shape[0]}x${data.shape[1]} points, max |Y| = ${data.max_radius.toFixed(4)}`;
      }

      document.getElementById("go").addEventListener("click", plot);
      window.addEventListener("resize", () => {
        camera.aspect = window.innerWidth / window.innerHeight;
        camera.updateProjectionMatrix();
        renderer.setSize(window.innerWidth, window.innerHeight);
      });
      function animate() {
        requestAnimationFrame(animate);
        controls.update();
        renderer.render(scene, camera);
      }
      animate();
      plot();
    </script>
  </body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults() {
        let (qn, config) = SurfaceQuery::default().resolve().unwrap();
        assert_eq!(qn, QuantumNumbers { l: 1, m: 0 });
        assert_eq!(config, RenderConfig::default());
    }

    #[test]
    fn test_query_is_clamped() {
        let q = SurfaceQuery {
            l: Some(2),
            m: Some(-2),
            theta_resolution: Some(10_000),
            phi_resolution: Some(0),
            view_extent: Some(-1.0),
            ..Default::default()
        };
        let (_, config) = q.resolve().unwrap();
        assert_eq!(config.theta_resolution, MAX_WEB_RESOLUTION);
        assert_eq!(config.phi_resolution, 2);
        assert_eq!(config.view_extent, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_query_rejects_bad_quantum_numbers() {
        let q = SurfaceQuery { l: Some(-1), ..Default::default() };
        assert!(matches!(q.resolve(), Err(HarmonicError::InvalidQuantumNumber(_))));
        let q = SurfaceQuery { l: Some(1), m: Some(2), ..Default::default() };
        assert!(matches!(q.resolve(), Err(HarmonicError::InvalidMagneticNumber(_))));
        let q = SurfaceQuery { l: Some(1), m: Some(i64::MIN), ..Default::default() };
        assert!(matches!(q.resolve(), Err(HarmonicError::InvalidMagneticNumber(_))));
    }

    #[test]
    fn test_query_degree_is_bounded() {
        let q = SurfaceQuery { l: Some(MAX_WEB_DEGREE), m: Some(0), ..Default::default() };
        assert_eq!(q.resolve().unwrap().0.l, MAX_WEB_DEGREE as u32);
        let q = SurfaceQuery { l: Some(2_000_000), m: Some(0), ..Default::default() };
        assert!(matches!(q.resolve(), Err(HarmonicError::InvalidQuantumNumber(_))));
    }

    #[test]
    fn test_surface_response_shape() {
        let q = SurfaceQuery {
            l: Some(0),
            m: Some(0),
            theta_resolution: Some(6),
            phi_resolution: Some(4),
            ..Default::default()
        };
        let (qn, config) = q.resolve().unwrap();
        let body = SurfaceResponse::from_surface(build_surface(qn, &config));
        assert_eq!(body.shape, [4, 6]);
        assert_eq!(body.vertices.len(), 24);
        assert_eq!(body.rgba.len(), 24);
        assert!(body.colors.iter().all(|&c| (c - 1.0).abs() < 1e-6));
        assert_eq!(body.projections.len(), 3);

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["normalization"]["kind"], "fixed_divisor");
        assert_eq!(json["projections"][0]["axis"], "z");
        assert_eq!(json["projections"][0]["colormap"], "winter");
    }

    #[test]
    fn test_png_endpoint_body() {
        let q = SurfaceQuery {
            theta_resolution: Some(12),
            phi_resolution: Some(12),
            size: Some(96),
            ..Default::default()
        };
        let (qn, config) = q.resolve().unwrap();
        let bytes = build_png(qn, &config).unwrap();
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
    }
}
