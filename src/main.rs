fn main() {
    ar_placement_core::run();
}
