// Test modules for Staffwire
// Cross-module and I/O-backed tests; small unit tests live next to their code

mod support;
