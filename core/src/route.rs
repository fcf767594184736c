use serde::Serialize;

use crate::alternatives::{k_shortest_paths_with, KPathsResult};
use crate::articulation::{articulation_points_with, CriticalPoints};
use crate::config::RouterConfig;
use crate::error::{Result, RouteError};
use crate::geo::Coordinate;
use crate::graph::{Graph, NodeIndex};
use crate::search::{search, PathResult, SearchVariant};

/// Both searches run between the same snapped endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteComparison {
    pub source: NodeIndex,
    pub destination: NodeIndex,
    pub dijkstra: PathResult,
    pub astar: PathResult,
}

/// Coordinate-level entry point over a borrowed road graph.
///
/// Positions are snapped to the nearest graph node, then handed to the
/// index-based engine. The router holds no mutable state.
pub struct Router<'g> {
    graph: &'g Graph,
    config: RouterConfig,
}

impl<'g> Router<'g> {
    pub fn new(graph: &'g Graph, config: RouterConfig) -> Self {
        Self { graph, config }
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Nearest node to `coord`.
    pub fn snap(&self, coord: Coordinate) -> Result<NodeIndex> {
        if !coord.is_valid() {
            return Err(RouteError::InvalidCoordinate {
                lat: coord.lat,
                lon: coord.lon,
            });
        }
        self.graph.nearest_node(coord).ok_or(RouteError::EmptyGraph)
    }

    /// Shortest route using the configured search.
    pub fn route(&self, from: Coordinate, to: Coordinate) -> Result<PathResult> {
        let (s, d) = (self.snap(from)?, self.snap(to)?);
        search(self.graph, s, d, self.config.variant, None, self.config.collect_memory)
    }

    /// Dijkstra and A* side by side.
    pub fn compare(&self, from: Coordinate, to: Coordinate) -> Result<RouteComparison> {
        let (source, destination) = (self.snap(from)?, self.snap(to)?);
        let collect = self.config.collect_memory;
        let run = |variant| search(self.graph, source, destination, variant, None, collect);
        let dijkstra = run(SearchVariant::Dijkstra)?;
        let astar = run(SearchVariant::AStar)?;

        if (dijkstra.length - astar.length).abs() > 1e-6 * dijkstra.length.max(1.0) {
            tracing::warn!(
                dijkstra = dijkstra.length,
                astar = astar.length,
                "search variants disagree on route length"
            );
        }

        Ok(RouteComparison {
            source,
            destination,
            dijkstra,
            astar,
        })
    }

    /// Up to `config.k` alternative routes.
    pub fn alternatives(&self, from: Coordinate, to: Coordinate) -> Result<KPathsResult> {
        let (s, d) = (self.snap(from)?, self.snap(to)?);
        k_shortest_paths_with(
            self.graph,
            s,
            d,
            self.config.variant,
            self.config.k,
            self.config.collect_memory,
        )
    }

    pub fn critical_points(&self) -> Result<CriticalPoints> {
        articulation_points_with(self.graph, self.config.collect_memory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon)
    }

    /// Two parallel east-west roads joined at both ends, plus a spur.
    ///
    ///   (0.001,0) --- (0.001,0.001) --- (0.001,0.002)
    ///       |                                 |
    ///   (0,0) ------- (0,0.001) ------- (0,0.002) --- (0,0.003)
    fn make_town() -> Graph {
        let mut g = Graph::new();
        g.load_polylines(vec![
            vec![c(0.0, 0.0), c(0.0, 0.001), c(0.0, 0.002), c(0.0, 0.003)],
            vec![c(0.0, 0.0), c(0.001, 0.0), c(0.001, 0.001), c(0.001, 0.002), c(0.0, 0.002)],
        ])
        .unwrap();
        g
    }

    fn quiet_config() -> RouterConfig {
        RouterConfig {
            collect_memory: false,
            ..RouterConfig::default()
        }
    }

    #[test]
    fn test_route_snaps_coordinates() {
        let g = make_town();
        let router = Router::new(&g, quiet_config());
        let r = router.route(c(0.00001, -0.00002), c(0.00002, 0.00299)).unwrap();
        let coords = g.path_coordinates(&r.path);
        assert_eq!(coords.first(), Some(&c(0.0, 0.0)));
        assert_eq!(coords.last(), Some(&c(0.0, 0.003)));
        // the southern road is straight, so it wins
        assert_eq!(r.path.len(), 4);
        assert_eq!(r.memory_delta_kb, 0);
    }

    #[test]
    fn test_compare_variants_agree() {
        let g = make_town();
        let router = Router::new(&g, quiet_config());
        let cmp = router.compare(c(0.0, 0.0), c(0.0, 0.003)).unwrap();
        assert_eq!(g.coordinate(cmp.source), Some(c(0.0, 0.0)));
        assert_eq!(g.coordinate(cmp.destination), Some(c(0.0, 0.003)));
        assert!((cmp.dijkstra.length - cmp.astar.length).abs() < 1e-6);
        assert!(cmp.astar.nodes_visited <= cmp.dijkstra.nodes_visited);
    }

    #[test]
    fn test_alternatives_use_configured_k() {
        let g = make_town();
        let router = Router::new(
            &g,
            RouterConfig {
                k: 1,
                ..quiet_config()
            },
        );
        let r = router.alternatives(c(0.0, 0.0), c(0.0, 0.002)).unwrap();
        assert_eq!(r.paths.len(), 1);

        let router = Router::new(&g, quiet_config());
        let r = router.alternatives(c(0.0, 0.0), c(0.0, 0.002)).unwrap();
        // straight road, then the loop over the northern road
        assert_eq!(r.paths.len(), 2);
        assert!(r.paths[0].length < r.paths[1].length);
    }

    #[test]
    fn test_critical_points() {
        let g = make_town();
        let router = Router::new(&g, quiet_config());
        let cp = router.critical_points().unwrap();
        let coords = g.path_coordinates(&cp.nodes);
        assert_eq!(coords, vec![c(0.0, 0.002)]);
    }

    #[test]
    fn test_snap_rejects_invalid_coordinates() {
        let g = make_town();
        let router = Router::new(&g, quiet_config());
        assert!(matches!(
            router.snap(c(f64::NAN, 0.0)),
            Err(RouteError::InvalidCoordinate { .. })
        ));
        assert!(router.route(c(0.0, 0.0), c(0.0, f64::INFINITY)).is_err());
    }

    #[test]
    fn test_empty_graph_errors() {
        let g = Graph::new();
        let router = Router::new(&g, quiet_config());
        assert_eq!(router.snap(c(0.0, 0.0)).unwrap_err(), RouteError::EmptyGraph);
        assert!(router.route(c(0.0, 0.0), c(1.0, 1.0)).is_err());
        assert_eq!(router.critical_points().unwrap_err(), RouteError::EmptyGraph);
    }
}
