fn main() {
    // Only the device build links against ESP-IDF; host test builds skip the
    // sysenv propagation entirely.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
