pub mod duckchat;
