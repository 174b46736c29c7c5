pub mod results_server;
