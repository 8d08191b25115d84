//! Visualization view: a decorative tree whose size depends on whether the
//! user has planted anything yet.

use crate::backend::Session;
use crate::config::ReadErrorPolicy;
use crate::events::RefreshOnPlant;
use crate::store::MemoryStoreClient;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

pub const BASE_SCALE: f32 = 1.0;
pub const GROWN_SCALE: f32 = 1.5;

/// Two tiers: baseline, and grown once anything has been planted.
pub fn tree_scale(count: u64) -> f32 {
    if count > 0 { GROWN_SCALE } else { BASE_SCALE }
}

pub fn planted_caption(count: u64) -> String {
    let noun = if count == 1 { "memory" } else { "memories" };
    format!("{} {} planted", count, noun)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Geometry {
    /// radius top, radius bottom, height, radial segments
    Cylinder([f32; 4]),
    /// radius, detail
    Icosahedron([f32; 2]),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mesh {
    pub name: &'static str,
    pub position: [f32; 3],
    pub geometry: Geometry,
    pub color: &'static str,
    pub roughness: f32,
    pub emissive: Option<(&'static str, f32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointLight {
    pub position: [f32; 3],
    pub intensity: f32,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Camera {
    pub position: [f32; 3],
    pub fov: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

/// Scene description handed to the renderer. Static apart from `scale`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeScene {
    pub scale: f32,
    pub camera: Camera,
    pub ambient_intensity: f32,
    pub lights: Vec<PointLight>,
    pub star_count: u32,
    pub meshes: Vec<Mesh>,
}

impl TreeScene {
    pub fn memory_tree(scale: f32) -> Self {
        const LEAF_EMISSIVE: &str = "#0a2f1c";
        Self {
            scale,
            camera: Camera {
                position: [0.0, 2.0, 6.0],
                fov: 50.0,
                min_distance: 3.0,
                max_distance: 12.0,
            },
            ambient_intensity: 0.3,
            lights: vec![
                PointLight {
                    position: [5.0, 5.0, 5.0],
                    intensity: 1.0,
                    color: "#d4af37",
                },
                PointLight {
                    position: [-3.0, 3.0, -3.0],
                    intensity: 0.5,
                    color: "#1a6b3c",
                },
            ],
            star_count: 1500,
            meshes: vec![
                Mesh {
                    name: "trunk",
                    position: [0.0, 1.0, 0.0],
                    geometry: Geometry::Cylinder([0.15, 0.25, 2.0, 8.0]),
                    color: "#5c3a1e",
                    roughness: 0.8,
                    emissive: None,
                },
                Mesh {
                    name: "crown",
                    position: [0.0, 2.8, 0.0],
                    geometry: Geometry::Icosahedron([1.2, 1.0]),
                    color: "#1a6b3c",
                    roughness: 0.6,
                    emissive: Some((LEAF_EMISSIVE, 0.2)),
                },
                Mesh {
                    name: "cluster_right",
                    position: [0.5, 2.2, 0.3],
                    geometry: Geometry::Icosahedron([0.6, 1.0]),
                    color: "#22804a",
                    roughness: 0.7,
                    emissive: Some((LEAF_EMISSIVE, 0.15)),
                },
                Mesh {
                    name: "cluster_left",
                    position: [-0.4, 2.4, -0.3],
                    geometry: Geometry::Icosahedron([0.5, 1.0]),
                    color: "#1f7040",
                    roughness: 0.7,
                    emissive: Some((LEAF_EMISSIVE, 0.15)),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeState {
    pub loading: bool,
    pub count: u64,
    pub error: Option<String>,
}

impl TreeState {
    pub fn scale(&self) -> f32 {
        tree_scale(self.count)
    }

    pub fn caption(&self) -> String {
        planted_caption(self.count)
    }

    pub fn scene(&self) -> TreeScene {
        TreeScene::memory_tree(self.scale())
    }
}

pub struct TreeView {
    store: MemoryStoreClient,
    policy: ReadErrorPolicy,
    state: RwLock<TreeState>,
    generation: AtomicU64,
    scope: CancellationToken,
}

impl TreeView {
    pub fn new(store: MemoryStoreClient, policy: ReadErrorPolicy) -> Self {
        Self {
            store,
            policy,
            state: RwLock::new(TreeState {
                loading: true,
                count: 0,
                error: None,
            }),
            generation: AtomicU64::new(0),
            scope: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> TreeState {
        self.state.read().clone()
    }

    /// Fetches the user's memory count (no rows).
    pub async fn load(&self, session: &Session) -> TreeState {
        if self.scope.is_cancelled() {
            return self.state();
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.write().loading = true;

        let result = tokio::select! {
            biased;
            _ = self.scope.cancelled() => return self.state(),
            result = self.store.count(session) => result,
        };

        let next = match result {
            Ok(count) => TreeState {
                loading: false,
                count,
                error: None,
            },
            Err(e) => {
                log::warn!("[TREE] Count fetch failed: {}", e);
                TreeState {
                    loading: false,
                    count: 0,
                    error: match self.policy {
                        ReadErrorPolicy::Silent => None,
                        ReadErrorPolicy::Visible => Some(e.to_string()),
                    },
                }
            }
        };

        if self.generation.load(Ordering::SeqCst) == generation {
            *self.state.write() = next.clone();
            next
        } else {
            self.state()
        }
    }

    pub fn unmount(&self) {
        self.scope.cancel();
    }
}

#[async_trait]
impl RefreshOnPlant for TreeView {
    fn scope(&self) -> &CancellationToken {
        &self.scope
    }

    async fn refresh(&self, session: &Session) {
        self.load(session).await;
    }
}
