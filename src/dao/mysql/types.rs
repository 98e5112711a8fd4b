use sqlx::{
    mysql::{MySqlConnectOptions, MySqlConnection},
    MySql,
};

pub type Connection = MySqlConnection;
pub type ConnectOptions = MySqlConnectOptions;
pub type DataBase = MySql;
