//! create-codepush-app - generates a CodePushified React Native demo app
//!
//! This library provides the steps behind the `create-codepush-app` CLI. All
//! external tools are invoked through [`runner::CommandRunner`].

pub mod assets;
pub mod cli;
pub mod codepush;
pub mod commands;
pub mod config;
pub mod expect;
pub mod npm;
pub mod patch;
pub mod runner;
