#![forbid(unsafe_code)]

fn main() {
    shex::main()
}
