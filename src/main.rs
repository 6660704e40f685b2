//! Thin CLI exercising the tracing engine end to end: load a vector layer
//! from GeoJSON, find the shortest path between two points, write the
//! result back out as GeoJSON.

use std::fs::File;
use std::rc::Rc;

use clap::{crate_version, App, Arg, SubCommand};

use graph_tracer::geometry::Point as GPoint;
use graph_tracer::source::{Feature, VectorLayer};
use graph_tracer::{Point, Tracer, TracerConfig};

fn geojson_to_layer(path: &str) -> anyhow::Result<VectorLayer> {
    let gj: geojson::GeoJson = serde_json::from_reader(File::open(path)?)?;
    let collection = match gj {
        geojson::GeoJson::FeatureCollection(fc) => fc,
        other => anyhow::bail!("expected a GeoJSON FeatureCollection, got {:?}", other),
    };
    let mut features = Vec::new();
    for (id, feature) in collection.features.into_iter().enumerate() {
        let Some(geometry) = feature.geometry else { continue };
        let geo_geom: geo::Geometry<f64> = geometry.value.try_into()?;
        let lines = flatten_to_polylines(geo_geom);
        if !lines.is_empty() {
            features.push(Feature { id: id as u64, geometry: lines });
        }
    }
    log::info!("loaded {} features from {}", features.len(), path);
    Ok(VectorLayer::new(features))
}

fn flatten_to_polylines(geom: geo::Geometry<f64>) -> Vec<graph_tracer::Polyline> {
    match geom {
        geo::Geometry::LineString(ls) => vec![ls.into()],
        geo::Geometry::MultiLineString(mls) => mls.0.into_iter().map(Into::into).collect(),
        geo::Geometry::Polygon(poly) => polygon_rings(poly),
        geo::Geometry::MultiPolygon(mp) => mp.0.into_iter().flat_map(polygon_rings).collect(),
        _ => Vec::new(),
    }
}

/// A polygon's exterior ring plus each of its interior (hole) rings, each as
/// its own closed-ring `Polyline` (a self-loop edge once built into a graph).
fn polygon_rings(poly: geo::Polygon<f64>) -> Vec<graph_tracer::Polyline> {
    std::iter::once(poly.exterior().clone().into())
        .chain(poly.interiors().iter().cloned().map(Into::into))
        .collect()
}

fn polyline_to_geojson(poly: &graph_tracer::Polyline) -> geojson::Geometry {
    geojson::Geometry::new(geojson::Value::LineString(
        poly.0.iter().map(|p| vec![p.x, p.y]).collect(),
    ))
}

fn parse_point(s: &str) -> anyhow::Result<Point> {
    let mut it = s.split(',');
    let x: f64 = it.next().ok_or_else(|| anyhow::anyhow!("missing x"))?.parse()?;
    let y: f64 = it.next().ok_or_else(|| anyhow::anyhow!("missing y"))?.parse()?;
    Ok(GPoint::new(x, y))
}

fn load_config(path: Option<&str>) -> anyhow::Result<TracerConfig> {
    match path {
        Some(path) => Ok(serde_yaml::from_reader(File::open(path)?)?),
        None => Ok(TracerConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"));

    let matches = App::new("graph-tracer")
        .version(crate_version!())
        .about("Trace the shortest path between two points over a planar graph built from vector linework")
        .subcommand(
            SubCommand::with_name("trace")
                .about("Find the shortest path between two points")
                .arg(Arg::with_name("layer").takes_value(true).required(true).index(1).help("Linework GeoJSON"))
                .arg(Arg::with_name("p1").takes_value(true).required(true).index(2).help("First point, as \"x,y\""))
                .arg(Arg::with_name("p2").takes_value(true).required(true).index(3).help("Second point, as \"x,y\""))
                .arg(Arg::with_name("output").short("o").long("output").takes_value(true).required(true).help("Output GeoJSON"))
                .arg(
                    Arg::with_name("config")
                        .short("c")
                        .long("config")
                        .takes_value(true)
                        .help("Tracer configuration, as YAML (destination_crs, extent, max_features, offset)"),
                ),
        )
        .get_matches();

    if let Some(matches) = matches.subcommand_matches("trace") {
        log::trace!("tracing enabled");
        let layer = geojson_to_layer(matches.value_of("layer").unwrap())?;
        let p1 = parse_point(matches.value_of("p1").unwrap())?;
        let p2 = parse_point(matches.value_of("p2").unwrap())?;
        let config = load_config(matches.value_of("config"))?;

        let mut tracer = Tracer::new();
        tracer.configure(config);
        tracer.set_layers(vec![Rc::new(layer) as Rc<dyn graph_tracer::FeatureSource>]);

        log::info!("loaded configuration");
        let result = tracer.find_shortest_path(p1, p2);
        match result.error {
            graph_tracer::TraceError::None => {
                log::info!("path found, length {}", result.polyline.length());
                let out = File::create(matches.value_of("output").unwrap())?;
                serde_json::to_writer(out, &polyline_to_geojson(&result.polyline))?;
            }
            other => {
                log::warn!("no path written: {}", other);
            }
        }
        if tracer.has_topology_problem() {
            log::warn!("linework had an unresolved topology problem; proceeded un-noded");
        }
    }

    Ok(())
}
