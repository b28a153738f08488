fn main() {
    homecare_lib::run()
}
