use hooks_tour::Tour;

const SCRIPT: &[(&str, &str)] = &[
    ("Counter", "+1"),
    ("Counter", "-1"),
    ("ReducerCounter", "inc"),
    ("ReducerCounter", "double"),
    ("ReducerCounter", "reset"),
    ("TourApp", "sign in"),
    ("RenderCounter", "type"),
    ("RenderCounter", "peek"),
    ("Session", "tick"),
    ("Session", "login"),
    ("Session", "inline"),
    ("Session", "tick"),
    ("Session", "use_callback"),
    ("Session", "tick"),
    ("Session", "use_ref"),
    ("Playlist", "switch"),
    ("Playlist", "louder"),
    ("Playlist", "later"),
    ("TourApp", "sign out"),
];

fn main() -> anyhow::Result<()> {
    init_logging();

    println!("=== Hookwork hooks tour ===");
    let mut tour = Tour::start()?;
    print_tree(&tour);

    for (component, label) in SCRIPT {
        println!();
        println!("> {component} / {label}");
        if !tour.press(component, label)? {
            anyhow::bail!("button {label:?} missing on {component}");
        }
        print_tree(&tour);
    }

    // Two stale value writes in one task land as a single increment.
    println!();
    println!("> Counter / +1 twice in one task");
    tour.press_together(&[("Counter", "+1"), ("Counter", "+1")])?;
    print_tree(&tour);
    Ok(())
}

#[cfg(feature = "logging")]
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[cfg(not(feature = "logging"))]
fn init_logging() {}

fn print_tree(tour: &Tour) {
    for line in tour.snapshot() {
        println!("{line}");
    }
}
