fn main() {
    drillhole_pipeline::cli::run();
}
