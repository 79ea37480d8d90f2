use node_arrange::{
    layout, Direction, GraphDescription, InvalidGraphError, Layout, NodeArrange, NodeRecord, Rect,
    Settings, SocketAlignment, Vec2,
};
use std::path::Path;
use test_log::test;

type Description = GraphDescription<String, String>;

fn load_fixture(name: &str) -> Description {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let input = std::fs::read_to_string(&path).expect("fixture read failed");
    ron::from_str(&input).expect("fixture parse failed")
}

fn node(id: &str, width: f32, height: f32) -> NodeRecord<String, String> {
    NodeRecord::new(id.to_string(), Vec2::new(width, height))
}

fn settings(direction: Direction) -> Settings {
    Settings::builder().direction(direction).build().unwrap()
}

fn node_rect(description: &Description, layout: &Layout<String, String>, id: &str) -> Rect {
    let record = description.nodes.iter().find(|node| node.id == id).unwrap();
    Rect::from_origin_size(layout.nodes[id], record.size)
}

fn all_directions() -> impl Iterator<Item = Direction> {
    Direction::FIXED.into_iter().chain([Direction::Balanced])
}

#[test]
fn simple_chain_is_flat() {
    let ids = ["input", "position", "join", "store", "output"];
    let mut description = Description::new();
    for id in ids {
        description = description.node(node(id, 120.0, 80.0));
    }
    for pair in ids.windows(2) {
        description = description.edge(pair[0].to_string(), 0, pair[1].to_string(), 0);
    }

    for direction in Direction::FIXED {
        let settings = Settings::builder()
            .direction(direction)
            .socket_alignment(SocketAlignment::None)
            .build()
            .unwrap();
        let layout = layout(&description, &settings).unwrap();
        for (step, id) in ids.iter().enumerate() {
            let position = layout.nodes[*id];
            assert_eq!(position.y, 0.0, "{direction:?}: {id} is off the line");
            assert_eq!(position.x, step as f32 * 170.0, "{direction:?}: {id}");
        }
        assert!(layout.reroutes.is_empty());
    }
}

fn diamond(first: &str, second: &str) -> Description {
    Description::new()
        .node(node("a", 100.0, 60.0))
        .node(node(first, 100.0, 60.0))
        .node(node(second, 100.0, 60.0))
        .node(node("d", 100.0, 60.0))
        .edge("a".into(), 0, "b".into(), 0)
        .edge("a".into(), 0, "c".into(), 0)
        .edge("b".into(), 0, "d".into(), 0)
        .edge("c".into(), 0, "d".into(), 0)
}

#[test]
fn diamond_centers_the_join() {
    let description = diamond("b", "c");
    let engine = NodeArrange::new(Settings::default());
    let layers = engine.compute_layers(&description).unwrap();
    assert_eq!(layers.rank(&"b".to_string()), layers.rank(&"c".to_string()));
    assert_eq!(layers.layer_count(), 3);

    let layout = engine.compute_positions(&layers);
    let (b, c, d) = (layout.nodes["b"], layout.nodes["c"], layout.nodes["d"]);
    assert_eq!(b.x, c.x);
    assert!(b.y < c.y);
    assert!((d.y - (b.y + c.y) / 2.0).abs() < 1e-3);
}

#[test]
fn diamond_order_follows_declaration() {
    let layout = layout(&diamond("c", "b"), &Settings::default()).unwrap();
    assert!(layout.nodes["c"].y < layout.nodes["b"].y);
}

#[test]
fn cycle_reverses_one_edge() {
    let description = Description::new()
        .node(node("a", 100.0, 60.0))
        .node(node("b", 100.0, 60.0))
        .node(node("c", 100.0, 60.0))
        .edge("a".into(), 0, "b".into(), 0)
        .edge("b".into(), 0, "c".into(), 0)
        .edge("c".into(), 0, "a".into(), 0);
    let engine = NodeArrange::default();
    let layers = engine.compute_layers(&description).unwrap();
    assert_eq!(layers.reversed_edges(), &[2]);

    let rank = |id: &str| layers.rank(&id.to_string()).unwrap();
    assert!(rank("b") > rank("a"));
    assert!(rank("c") > rank("b"));
    // c -> a is drawn backwards
    assert!(rank("a") < rank("c"));

    let layout = engine.compute_positions(&layers);
    assert_eq!(layout.reversed_edges, vec![2]);
}

#[test]
fn edges_point_forward_after_ranking() {
    let description = load_fixture("frames.ron");
    let layers = NodeArrange::default().compute_layers(&description).unwrap();
    for (index, edge) in description.edges.iter().enumerate() {
        let from = layers.rank(&edge.from).unwrap();
        let to = layers.rank(&edge.to).unwrap();
        if layers.reversed_edges().contains(&index) {
            assert!(from > to, "edge {index}");
        } else {
            assert!(to > from, "edge {index}");
        }
    }
    assert!(layers.crossings() <= layers.initial_crossings());
}

#[test]
fn layout_is_deterministic() {
    let description = load_fixture("frames.ron");
    for direction in all_directions() {
        let first = layout(&description, &settings(direction)).unwrap();
        let second = layout(&description, &settings(direction)).unwrap();
        assert_eq!(first, second);
        for (id, position) in &first.nodes {
            assert_eq!(position.x.to_bits(), second.nodes[id].x.to_bits());
            assert_eq!(position.y.to_bits(), second.nodes[id].y.to_bits());
        }
    }
}

#[test]
fn balanced_is_the_mean_of_the_fixed_directions() {
    let description = load_fixture("frames.ron");
    let fixed: Vec<_> = Direction::FIXED
        .into_iter()
        .map(|direction| layout(&description, &settings(direction)).unwrap())
        .collect();
    let balanced = layout(&description, &settings(Direction::Balanced)).unwrap();

    for (id, position) in &balanced.nodes {
        let x = fixed.iter().map(|layout| layout.nodes[id].x).sum::<f32>() / 4.0;
        let y = fixed.iter().map(|layout| layout.nodes[id].y).sum::<f32>() / 4.0;
        assert!((position.x - x).abs() < 1e-3, "{id}: x {} vs {x}", position.x);
        assert!((position.y - y).abs() < 1e-3, "{id}: y {} vs {y}", position.y);
    }
}

#[test]
fn frames_contain_their_content() {
    let description = load_fixture("frames.ron");
    for direction in all_directions() {
        let layout = layout(&description, &settings(direction)).unwrap();
        assert_eq!(layout.frames.len(), 3);

        for record in &description.nodes {
            if let Some(frame) = &record.frame {
                let rect = node_rect(&description, &layout, &record.id);
                assert!(layout.frames[frame].contains_rect(&rect), "{direction:?}: {}", record.id);
            }
        }
        for frame in &description.frames {
            if let Some(parent) = &frame.parent {
                assert!(layout.frames[parent].contains_rect(&layout.frames[&frame.id]));
            }
        }
        for reroute in &layout.reroutes {
            if let Some(frame) = &reroute.frame {
                assert!(layout.frames[frame].contains(reroute.position));
            }
        }
    }
}

#[test]
fn siblings_respect_the_spacing_floor() {
    let description = load_fixture("frames.ron");
    let engine = NodeArrange::default();
    let layers = engine.compute_layers(&description).unwrap();

    for direction in all_directions() {
        let layout = NodeArrange::new(settings(direction)).compute_positions(&layers);
        for layer in layers.layers() {
            for (i, upper) in layer.iter().enumerate() {
                for lower in &layer[i + 1..] {
                    let (upper, lower) = (
                        node_rect(&description, &layout, upper),
                        node_rect(&description, &layout, lower),
                    );
                    let gap = (lower.min.y - upper.max.y).max(upper.min.y - lower.max.y);
                    assert!(gap >= 25.0 - 1e-3, "{direction:?}: gap {gap}");
                }
            }
        }
        for pair in layers.layers().windows(2) {
            for left in &pair[0] {
                for right in &pair[1] {
                    let (left, right) = (
                        node_rect(&description, &layout, left),
                        node_rect(&description, &layout, right),
                    );
                    assert!(right.min.x - left.max.x >= 50.0 - 1e-3);
                }
            }
        }
    }
}

#[test]
fn collapsed_math_nodes_stack() {
    let math = |id: &str| node(id, 100.0, 30.0).collapsed(true).math(true);
    let description = Description::new()
        .node(node("src", 100.0, 60.0))
        .node(math("m1"))
        .node(math("m2"))
        .edge("src".into(), 0, "m1".into(), 0)
        .edge("src".into(), 0, "m2".into(), 0);

    let gap = |stack: bool| {
        let settings = Settings::builder()
            .direction(Direction::LeftDown)
            .stack_collapsed(stack)
            .stack_margin_y_factor(0.5)
            .build()
            .unwrap();
        let layout = layout(&description, &settings).unwrap();
        layout.nodes["m2"].y - (layout.nodes["m1"].y + 30.0)
    };
    assert_eq!(gap(false), 25.0);
    assert_eq!(gap(true), 12.5);
}

#[test]
fn reroutes_follow_the_setting() {
    let description = load_fixture("frames.ron");
    let engine = NodeArrange::default();
    let layers = engine.compute_layers(&description).unwrap();

    let expected: usize = description
        .edges
        .iter()
        .map(|edge| {
            let from = layers.rank(&edge.from).unwrap();
            let to = layers.rank(&edge.to).unwrap();
            from.abs_diff(to) - 1
        })
        .sum();
    assert!(expected > 0);
    let with = engine.compute_positions(&layers);
    assert_eq!(with.reroutes.len(), expected);

    let without_settings = Settings::builder().add_reroutes(false).build().unwrap();
    let without = layout(&description, &without_settings).unwrap();
    assert!(without.reroutes.is_empty());
    assert_eq!(without.nodes.len(), description.nodes.len());
}

#[test]
fn malformed_descriptions_are_rejected() {
    let description = Description::new()
        .node(node("a", 100.0, 60.0))
        .edge("a".into(), 0, "a".into(), 0);
    assert!(layout(&description, &Settings::default()).is_err());

    let description = Description::new().node(node("a", 100.0, 60.0).in_frame("nowhere".into()));
    assert!(layout(&description, &Settings::default()).is_err());

    // Bad sizes are reported before any stage runs
    for height in [-10.0, f32::NAN] {
        let description = Description::new()
            .node(node("a", 100.0, height))
            .node(node("b", 100.0, 60.0))
            .edge("a".into(), 0, "b".into(), 0);
        for direction in [Direction::LeftDown, Direction::Balanced] {
            let settings = Settings::builder().direction(direction).build().unwrap();
            assert!(matches!(
                layout(&description, &settings),
                Err(InvalidGraphError::InvalidSize { .. })
            ));
        }
    }
}
