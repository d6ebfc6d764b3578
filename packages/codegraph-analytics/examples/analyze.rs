//! Build a small synthetic graph and run the analytic surfaces over it.
//!
//! ```sh
//! cargo run --example analyze
//! ```

use std::sync::Arc;

use codegraph_analytics::{
    AggFunc, CallSite, CancelToken, CrsRecorder, EngineConfig, GraphAnalytics, GraphBuilder,
    InMemoryRecorder, Location, ParseResult, Symbol, SymbolKind,
};

fn call(target: &str, line: u32) -> CallSite {
    CallSite {
        target: target.to_string(),
        is_method: false,
        receiver: None,
        location: Location::new("app.go", line, 1),
    }
}

fn main() {
    tracing_subscriber_init();

    // A tiny service: main fans out to two handlers, one shares a helper.
    let mut main_fn = Symbol::new("app.go:1:main", "main", SymbolKind::Function).with_package("app");
    main_fn.calls.push(call("handleUsers", 3));
    main_fn.calls.push(call("handleOrders", 4));
    let mut users =
        Symbol::new("app.go:10:handleUsers", "handleUsers", SymbolKind::Function).with_package("app");
    users.calls.push(call("render", 12));
    let orders = Symbol::new("app.go:20:handleOrders", "handleOrders", SymbolKind::Function)
        .with_package("app");
    let render =
        Symbol::new("view.go:1:render", "render", SymbolKind::Function).with_package("view");
    let unused =
        Symbol::new("view.go:9:legacyRender", "legacyRender", SymbolKind::Function)
            .with_package("view");

    let mut builder = GraphBuilder::new("/demo");
    builder.add_parse_result(Some(ParseResult {
        file_path: "app.go".to_string(),
        language: "go".to_string(),
        package: "app".to_string(),
        symbols: vec![main_fn, users, orders],
        imports: Vec::new(),
    }));
    builder.add_parse_result(Some(ParseResult {
        file_path: "view.go".to_string(),
        language: "go".to_string(),
        package: "view".to_string(),
        symbols: vec![render, unused],
        imports: Vec::new(),
    }));
    let (graph, report) = builder.build();
    println!(
        "built graph: {} nodes, {} edges ({} files, {} failed)",
        graph.node_count(),
        graph.edge_count(),
        report.files_processed,
        report.files_failed
    );

    let ctx = CancelToken::new();
    let sink = Arc::new(InMemoryRecorder::new());
    let mut engine = GraphAnalytics::new(Arc::new(graph), EngineConfig::default())
        .unwrap()
        .with_recorder(sink.clone());

    // one slot per symbol, seeded with a uniform cost of 1
    engine.attach_values(&ctx, AggFunc::Sum, |_| 1).unwrap();

    let crs: &Arc<CrsRecorder> = engine.crs().unwrap();
    crs.start_session("demo").unwrap();

    let (hotspots, _) = engine.analytics().hotspots_with_crs(&ctx, 3);
    for spot in hotspots.unwrap() {
        println!(
            "hotspot #{}: {} (in={}, out={}, score={})",
            spot.rank, spot.node_id, spot.in_degree, spot.out_degree, spot.score
        );
    }

    let (dead, _) = engine.analytics().dead_code_with_crs(&ctx);
    println!("dead code: {:?}", dead.unwrap());

    let pagerank = engine.pagerank(&ctx).unwrap();
    for (id, score) in pagerank.top_k(3) {
        println!("pagerank {score:.4}  {id}");
    }

    let query = engine.path_query().unwrap();
    let (cost, _) = query.path_query_with_crs(&ctx, "app.go:1:main", "view.go:1:render");
    println!("path cost main -> render: {}", cost.unwrap());

    engine
        .path_update()
        .unwrap()
        .path_update(&ctx, "app.go:1:main", "view.go:1:render", 9)
        .unwrap();
    println!(
        "after a +9 along that path: {}",
        query
            .path_sum(&ctx, "app.go:1:main", "view.go:1:render")
            .unwrap()
    );

    println!("recorded {} step(s) in session 'demo'", sink.steps_for("demo").len());
}

fn tracing_subscriber_init() {
    // demos log straight to stderr; the library itself only emits tracing events
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}
